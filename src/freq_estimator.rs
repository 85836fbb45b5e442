//! freq_estimator — online per-page change-frequency estimate (L3).
//!
//! The "Simple" estimator tracks `(first_time, last_time, update_count)` per
//! page and reports `update_count / (last_time - first_time)`. Time comes
//! from an injected [`Clock`] rather than `SystemTime` directly, so tests
//! can drive it deterministically with [`ManualClock`] instead of racing
//! real wall-clock ticks.
//!
//! Kept purely in memory: these are derived numbers recomputed from refresh
//! history, not a durable fact the way a page's URL or digest is, and a
//! `SystemClock`-based estimate from a previous process run would not mean
//! anything useful after a restart anyway.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ids::PageId;

pub trait Clock {
    fn now(&self) -> f64;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// A clock a test sets explicitly; never advances on its own. Cloning
/// shares the same underlying counter (`Rc`), so a caller can hand one
/// clone to a `FreqEstimator` and keep another to drive time forward.
#[derive(Clone)]
pub struct ManualClock {
    now: std::rc::Rc<std::cell::Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: std::rc::Rc::new(std::cell::Cell::new(start)),
        }
    }

    pub fn set(&self, t: f64) {
        self.now.set(t);
    }

    pub fn advance(&self, dt: f64) {
        self.now.set(self.now.get() + dt);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Clone, Copy, Debug)]
struct EstRow {
    first_time: f64,
    last_time: f64,
    update_count: u64,
}

pub struct FreqEstimator<C: Clock> {
    clock: C,
    rows: BTreeMap<PageId, EstRow>,
}

impl<C: Clock> FreqEstimator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            rows: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, p: &PageId) {
        let now = self.clock.now();
        self.rows.entry(p.clone()).or_insert(EstRow {
            first_time: now,
            last_time: now,
            update_count: 0,
        });
    }

    pub fn delete(&mut self, p: &PageId) {
        self.rows.remove(p);
    }

    /// Record a refresh outcome. Creates the row (via `add`) if unknown.
    pub fn refresh(&mut self, p: &PageId, changed: bool) {
        self.add(p);
        let now = self.clock.now();
        if let Some(row) = self.rows.get_mut(p) {
            row.last_time = now;
            if changed {
                row.update_count += 1;
            }
        }
    }

    /// Estimated change frequency in Hz, or `None` if `p` is unknown or has
    /// not yet accumulated any elapsed time since its first sighting.
    pub fn frequency(&self, p: &PageId) -> Option<f64> {
        let row = self.rows.get(p)?;
        let elapsed = row.last_time - row.first_time;
        if elapsed <= 0.0 {
            None
        } else {
            Some(row.update_count as f64 / elapsed)
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
