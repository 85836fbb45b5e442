//! util — small shared helpers that don't belong to any one store.

/// Current Unix time in seconds, saturating to `u64`. Used for `UpdateRow`'s
/// wall-clock `first_seen`/`last_seen` fields — independent of the engine's
/// own dimensionless virtual clock (see `opic::OpicHits`).
#[inline]
pub fn now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Clamp `x` into `[lo, hi]`, treating NaN as `lo`.
#[inline]
pub fn clamp_f64(x: f64, lo: f64, hi: f64) -> f64 {
    if x.is_nan() {
        lo
    } else {
        x.max(lo).min(hi)
    }
}
