//! hits_score — page id → six-field hub/authority record (L2), with a
//! global cash-delta optimisation.
//!
//! `increase_all_cash` is called once per iteration (the virtual-page
//! step) and would otherwise have to touch every row. Instead the store
//! keeps two scalar deltas `(delta_h, delta_a)`: every read adds delta,
//! every write subtracts it before persisting, so a bulk "add to every row"
//! is O(1) and ordering by `h_cash`/`a_cash` is unaffected (a common
//! additive shift preserves order). The deltas — and the engine's virtual
//! clock and virtual-page row, which need the same restart durability —
//! live in one singleton JSON row, flushed together with the main table.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::consts::{ENGINE_STATE_FILE, SCORES_FILE};
use crate::ids::PageId;
use crate::store::{SingletonFile, Table};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitsScoreRow {
    pub h_history: f64,
    pub h_cash: f64,
    pub h_last: f64,
    pub a_history: f64,
    pub a_cash: f64,
    pub a_last: f64,
}

impl HitsScoreRow {
    pub fn fresh(now: f64) -> Self {
        Self {
            h_history: 0.0,
            h_cash: 1.0,
            h_last: now,
            a_history: 0.0,
            a_cash: 1.0,
            a_last: now,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub delta_h: f64,
    pub delta_a: f64,
    pub virtual_time: f64,
    pub virtual_page: Option<HitsScoreRow>,
}

pub struct HitsScoreStore {
    /// Raw (pre-delta) rows: `h_cash`/`a_cash` here are `true - delta`.
    rows: Table<PageId, HitsScoreRow>,
    state: SingletonFile<EngineState>,
}

impl HitsScoreStore {
    pub fn open(workdir: Option<&Path>) -> Result<Self> {
        let rows_path = workdir.map(|d| d.join(SCORES_FILE));
        let state_path = workdir.map(|d| d.join(ENGINE_STATE_FILE));
        Ok(Self {
            rows: Table::open(rows_path.as_deref())?,
            state: SingletonFile::open(state_path.as_deref())?,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, p: &PageId) -> bool {
        self.rows.contains(p)
    }

    /// Insert only if absent, storing cash with the delta already removed.
    /// Returns true if newly inserted.
    pub fn add(&mut self, p: &PageId, row: HitsScoreRow) -> bool {
        let (dh, da) = self.deltas();
        self.rows.insert_if_absent(
            p.clone(),
            HitsScoreRow {
                h_cash: row.h_cash - dh,
                a_cash: row.a_cash - da,
                ..row
            },
        )
    }

    /// True (delta-adjusted) row for `p`, or `None` if unknown.
    pub fn get(&self, p: &PageId) -> Option<HitsScoreRow> {
        let (dh, da) = self.deltas();
        self.rows.get(p).map(|r| HitsScoreRow {
            h_cash: r.h_cash + dh,
            a_cash: r.a_cash + da,
            ..*r
        })
    }

    /// Overwrite `p`'s row with true (delta-adjusted) values.
    pub fn set(&mut self, p: &PageId, row: HitsScoreRow) {
        let (dh, da) = self.deltas();
        self.rows.upsert(
            p.clone(),
            HitsScoreRow {
                h_cash: row.h_cash - dh,
                a_cash: row.a_cash - da,
                ..row
            },
        );
    }

    /// O(1): shift every row's cash by `(dh, da)` without touching them.
    pub fn increase_all_cash(&mut self, dh: f64, da: f64) {
        self.state.modify(|s| {
            s.delta_h += dh;
            s.delta_a += da;
        });
    }

    /// Add `dh` to the hub cash of exactly the listed pages (used by the
    /// authority step to pay predecessors back — a small, explicit id list,
    /// never a bulk "all rows" operation, so no delta trick applies here).
    pub fn increase_h_cash(&mut self, ids: &[PageId], dh: f64) {
        for id in ids {
            if let Some(row) = self.rows.get_mut(id) {
                row.h_cash += dh;
            }
        }
    }

    pub fn increase_a_cash(&mut self, ids: &[PageId], da: f64) {
        for id in ids {
            if let Some(row) = self.rows.get_mut(id) {
                row.a_cash += da;
            }
        }
    }

    /// Top-n pages by true `h_cash`, without materialising the delta — a
    /// common additive shift preserves order, so the raw stored values sort
    /// identically to the true ones.
    pub fn top_n_h_cash(&self, n: usize) -> Vec<PageId> {
        self.rows.top_n_by(n, |_, r| r.h_cash)
    }

    pub fn top_n_a_cash(&self, n: usize) -> Vec<PageId> {
        self.rows.top_n_by(n, |_, r| r.a_cash)
    }

    /// Iterate true (delta-adjusted) rows. History fields are untouched by
    /// the delta trick (only cash is), so callers summing history need no
    /// adjustment; cash fields here are still corrected for correctness.
    pub fn iter(&self) -> impl Iterator<Item = (PageId, HitsScoreRow)> + '_ {
        let (dh, da) = self.deltas();
        self.rows.iter().map(move |(k, r)| {
            (
                k.clone(),
                HitsScoreRow {
                    h_cash: r.h_cash + dh,
                    a_cash: r.a_cash + da,
                    ..*r
                },
            )
        })
    }

    fn deltas(&self) -> (f64, f64) {
        let s = self.state.get();
        (s.delta_h, s.delta_a)
    }

    pub fn virtual_page(&self) -> HitsScoreRow {
        self.state
            .get()
            .virtual_page
            .unwrap_or_else(|| HitsScoreRow::fresh(0.0))
    }

    pub fn set_virtual_page(&mut self, row: HitsScoreRow) {
        self.state.modify(|s| s.virtual_page = Some(row));
    }

    pub fn virtual_time(&self) -> f64 {
        self.state.get().virtual_time
    }

    pub fn advance_virtual_time(&mut self, delta: f64) {
        self.state.modify(|s| s.virtual_time += delta);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.state.set(EngineState::default());
    }

    pub fn flush(&mut self) -> Result<()> {
        self.rows.flush()?;
        self.state.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(b: u8) -> PageId {
        PageId::new(vec![b]).unwrap()
    }

    #[test]
    fn add_then_get_is_exact() {
        let mut s = HitsScoreStore::open(None).unwrap();
        let p = pid(1);
        s.add(&p, HitsScoreRow::fresh(0.0));
        let got = s.get(&p).unwrap();
        assert_eq!(got.h_cash, 1.0);
        assert_eq!(got.a_cash, 1.0);
    }

    #[test]
    fn cash_delta_equivalence_against_a_naive_reference() {
        // increase_all_cash must be observationally identical to directly
        // bumping every row, for every page, after any sequence of global
        // bumps interleaved with per-page reads/writes.
        let mut s = HitsScoreStore::open(None).unwrap();
        let mut naive: std::collections::HashMap<PageId, HitsScoreRow> =
            std::collections::HashMap::new();

        for i in 0..5u8 {
            let p = pid(i);
            let row = HitsScoreRow::fresh(0.0);
            s.add(&p, row);
            naive.insert(p, row);
        }

        let bumps = [(0.3, -0.1), (1.0, 0.0), (-0.2, 0.25)];
        for (dh, da) in bumps {
            s.increase_all_cash(dh, da);
            for row in naive.values_mut() {
                row.h_cash += dh;
                row.a_cash += da;
            }
        }

        for i in 0..5u8 {
            let p = pid(i);
            let got = s.get(&p).unwrap();
            let want = naive.get(&p).unwrap();
            assert!((got.h_cash - want.h_cash).abs() < 1e-12);
            assert!((got.a_cash - want.a_cash).abs() < 1e-12);
        }
    }

    #[test]
    fn top_n_h_cash_is_order_preserving_under_a_global_delta() {
        let mut s = HitsScoreStore::open(None).unwrap();
        for (i, cash) in [(0u8, 1.0), (1, 5.0), (2, 3.0)] {
            let mut row = HitsScoreRow::fresh(0.0);
            row.h_cash = cash;
            s.add(&pid(i), row);
        }
        s.increase_all_cash(100.0, 0.0);
        assert_eq!(s.top_n_h_cash(1), vec![pid(1)]);
        assert_eq!(s.top_n_h_cash(2), vec![pid(1), pid(2)]);
    }

    #[test]
    fn increase_h_cash_targets_only_listed_pages() {
        let mut s = HitsScoreStore::open(None).unwrap();
        s.add(&pid(1), HitsScoreRow::fresh(0.0));
        s.add(&pid(2), HitsScoreRow::fresh(0.0));
        s.increase_h_cash(&[pid(1)], 10.0);
        assert_eq!(s.get(&pid(1)).unwrap().h_cash, 11.0);
        assert_eq!(s.get(&pid(2)).unwrap().h_cash, 1.0);
    }
}
