//! opic — the OPIC-HITS engine: cash-flow, virtual page, history roll (L4).
//!
//! Each page holds hub and authority "cash"; an update step drains a page's
//! cash to its neighbours (and a shared virtual page standing in for the
//! rest of the web) and rolls the drained amount into that page's history.
//! Relative hub/authority scores are each page's history share of the total
//! history. A virtual clock — advanced by cash drained, not wall time —
//! feeds an optional leaky-integrator history window so old activity can be
//! forgotten at a configurable half-life-like rate.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use log::{debug, warn};

use crate::consts::RELEVANCE_FILE;
use crate::graph::GraphStore;
use crate::hits_score::{HitsScoreRow, HitsScoreStore};
use crate::ids::{PageId, VIRTUAL_PAGE_LABEL};
use crate::store::Table;
use crate::util::clamp_f64;

pub struct OpicHits {
    scores: HitsScoreStore,
    relevance: Table<PageId, f64>,
    time_window: Option<f64>,
    batch_multiplier: usize,
    n_pages: usize,
    h_total: f64,
    a_total: f64,
    must_update: Vec<PageId>,
}

impl OpicHits {
    /// Opens (or creates) the score and relevance stores under `workdir`,
    /// ensures every existing graph node has a score row, and recomputes
    /// the aggregate history totals with a single linear scan — matching
    /// the original's `SUM(...)`-at-construction approach rather than
    /// persisting a second, driftable copy of the aggregate.
    pub fn open(
        workdir: Option<&Path>,
        graph: &GraphStore,
        time_window: Option<f64>,
        batch_multiplier: usize,
    ) -> Result<Self> {
        let relevance_path = workdir.map(|d| d.join(RELEVANCE_FILE));
        let mut engine = Self {
            scores: HitsScoreStore::open(workdir)?,
            relevance: Table::open(relevance_path.as_deref())?,
            time_window,
            batch_multiplier: batch_multiplier.max(1),
            n_pages: 0,
            h_total: 0.0,
            a_total: 0.0,
            must_update: Vec::new(),
        };

        for p in graph.nodes() {
            engine.add_page(p);
        }

        let (mut h_total, mut a_total) = (0.0, 0.0);
        for (_, row) in engine.scores.iter() {
            h_total += row.h_history;
            a_total += row.a_history;
        }
        engine.h_total = h_total;
        engine.a_total = a_total;
        engine.n_pages = engine.scores.len();

        Ok(engine)
    }

    /// Idempotent. Returns true if `p` was newly scored.
    pub fn add_page(&mut self, p: &PageId) -> bool {
        let now = self.scores.virtual_time();
        let added = self.scores.add(p, HitsScoreRow::fresh(now));
        if added {
            self.n_pages += 1;
            debug!("opic: scored new page {p}");
        }
        added
    }

    pub fn mark_update(&mut self, p: &PageId) {
        self.must_update.push(p.clone());
    }

    pub fn set_relevance(&mut self, p: &PageId, r: f64) {
        self.relevance.upsert(p.clone(), clamp_f64(r, 0.0, 1.0));
    }

    pub fn relevance(&self, p: &PageId) -> f64 {
        self.relevance
            .get(p)
            .copied()
            .unwrap_or(crate::consts::DEFAULT_RELEVANCE)
    }

    /// Raw (not history-relative) current cash for `p`; used by the facade
    /// to rank first-time-fetch candidates, where history share is not yet
    /// meaningful the way accumulated cash is.
    pub fn cash(&self, p: &PageId) -> (f64, f64) {
        self.scores
            .get(p)
            .map(|r| (r.h_cash, r.a_cash))
            .unwrap_or((0.0, 0.0))
    }

    pub fn get_scores(&self, p: &PageId) -> (f64, f64) {
        match self.scores.get(p) {
            Some(row) => self.relative_score(&row),
            None => (0.0, 0.0),
        }
    }

    /// Current `(h_cash, a_cash)` held by the virtual page, the shared
    /// stand-in for "the rest of the web" every real page also drains cash
    /// into. Exposed for cash-conservation checks: the sum of every real
    /// page's cash plus this is invariant across an update batch.
    pub fn virtual_cash(&self) -> (f64, f64) {
        let row = self.scores.virtual_page();
        (row.h_cash, row.a_cash)
    }

    pub fn iter_scores(&self) -> impl Iterator<Item = (PageId, f64, f64)> + '_ {
        self.scores.iter().map(move |(p, row)| {
            let (h, a) = self.relative_score(&row);
            (p, h, a)
        })
    }

    fn relative_score(&self, row: &HitsScoreRow) -> (f64, f64) {
        let h = if self.h_total > 0.0 {
            row.h_history / self.h_total
        } else {
            0.0
        };
        let a = if self.a_total > 0.0 {
            row.a_history / self.a_total
        } else {
            0.0
        };
        (h, a)
    }

    pub fn h_mean(&self) -> f64 {
        if self.n_pages > 0 {
            self.h_total / self.n_pages as f64
        } else {
            1.0
        }
    }

    pub fn a_mean(&self) -> f64 {
        if self.n_pages > 0 {
            self.a_total / self.n_pages as f64
        } else {
            1.0
        }
    }

    /// Runs `n_iter` rounds of the cash-flow step, returning the pages
    /// whose hub (resp. authority) score was touched across all rounds.
    pub fn update(&mut self, n_iter: usize, graph: &GraphStore) -> (Vec<PageId>, Vec<PageId>) {
        let mut all_h = Vec::new();
        let mut all_a = Vec::new();

        for _ in 0..n_iter {
            let must = std::mem::take(&mut self.must_update);
            let k = self.batch_multiplier * must.len().max(1);

            let highest_h = self.scores.top_n_h_cash(k);
            let highest_a = self.scores.top_n_a_cash(k);

            let mut mixed: Vec<(f64, PageId, bool)> = Vec::with_capacity(highest_h.len() + highest_a.len());
            for p in highest_h {
                let cash = self.scores.get(&p).map(|r| r.h_cash).unwrap_or(0.0);
                mixed.push((cash, p, true));
            }
            for p in highest_a {
                let cash = self.scores.get(&p).map(|r| r.a_cash).unwrap_or(0.0);
                mixed.push((cash, p, false));
            }
            mixed.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.1.cmp(&b.1))
            });
            mixed.truncate(k);

            // The must-update set is always drained, on both channels,
            // regardless of cash rank: that is the entire point of
            // exposing `mark_update` as an explicit bypass.
            for p in &must {
                mixed.push((f64::INFINITY, p.clone(), true));
                mixed.push((f64::INFINITY, p.clone(), false));
            }

            let mut seen: HashSet<(PageId, bool)> = HashSet::new();
            let mut batch_h = Vec::new();
            let mut batch_a = Vec::new();
            for (_, p, is_hub) in mixed {
                if !seen.insert((p.clone(), is_hub)) {
                    continue;
                }
                if is_hub {
                    self.update_page_h(&p, graph);
                    batch_h.push(p);
                } else {
                    self.update_page_a(&p, graph);
                    batch_a.push(p);
                }
            }

            self.update_virtual_page();
            debug!(
                "opic: iteration drained {} hub and {} authority updates",
                batch_h.len(),
                batch_a.len()
            );
            all_h.extend(batch_h);
            all_a.extend(batch_a);
        }

        (all_h, all_a)
    }

    fn history_roll(&self, history: f64, cash: f64, last: f64, now: f64) -> f64 {
        match self.time_window {
            None => history + cash,
            Some(w) if w > 0.0 => {
                let f = (now - last) / w;
                if f < 1.0 {
                    history * (1.0 - f) + cash
                } else {
                    cash / f
                }
            }
            Some(_) => history + cash,
        }
    }

    fn update_page_h(&mut self, p: &PageId, graph: &GraphStore) {
        self.add_page(p);
        let score = self.scores.get(p).expect("just ensured present");
        let succ: Vec<PageId> = graph.successors(p).into_iter().filter(|s| s != p).collect();

        let a_dist = score.h_cash / (succ.len() as f64 + 1.0);
        self.scores.increase_a_cash(&succ, a_dist);
        let mut vp = self.scores.virtual_page();
        vp.a_cash += a_dist;
        self.scores.set_virtual_page(vp);

        let now = self.scores.virtual_time();
        let new_history = self.history_roll(score.h_history, score.h_cash, score.h_last, now);
        let new_score = HitsScoreRow {
            h_history: new_history,
            h_cash: 0.0,
            h_last: now,
            ..score
        };
        self.h_total += new_score.h_history - score.h_history;
        self.scores.set(p, new_score);
        self.scores.advance_virtual_time(score.h_cash);
    }

    fn update_page_a(&mut self, p: &PageId, graph: &GraphStore) {
        self.add_page(p);
        let score = self.scores.get(p).expect("just ensured present");
        let pred: Vec<PageId> = graph.predecessors(p).into_iter().filter(|s| s != p).collect();
        let n = pred.len();

        let r = self.relevance(p);
        let z = z_share(r, n);

        self.scores.increase_h_cash(&pred, score.a_cash * z);
        let mut vp = self.scores.virtual_page();
        vp.h_cash += score.a_cash * (1.0 - z * n as f64);
        self.scores.set_virtual_page(vp);

        let now = self.scores.virtual_time();
        let new_history = self.history_roll(score.a_history, score.a_cash, score.a_last, now);
        let new_score = HitsScoreRow {
            a_history: new_history,
            a_cash: 0.0,
            a_last: now,
            ..score
        };
        self.a_total += new_score.a_history - score.a_history;
        self.scores.set(p, new_score);
        self.scores.advance_virtual_time(score.a_cash);
    }

    fn update_virtual_page(&mut self) {
        if self.n_pages == 0 {
            return;
        }
        let vp = self.scores.virtual_page();
        let h_dist = vp.a_cash / self.n_pages as f64;
        let a_dist = vp.h_cash / self.n_pages as f64;
        debug!(
            "opic: draining virtual page {VIRTUAL_PAGE_LABEL} (h_cash={:.4}, a_cash={:.4}) across {} pages",
            vp.h_cash, vp.a_cash, self.n_pages
        );
        self.scores.increase_all_cash(h_dist, a_dist);

        let now = self.scores.virtual_time();
        let a_history_new = self.history_roll(vp.a_history, vp.a_cash, vp.a_last, now);
        let h_history_new = self.history_roll(vp.h_history, vp.h_cash, vp.h_last, now);
        self.scores.set_virtual_page(HitsScoreRow {
            h_history: h_history_new,
            h_cash: 0.0,
            h_last: now,
            a_history: a_history_new,
            a_cash: 0.0,
            a_last: now,
        });
    }

    pub fn close(&mut self) -> Result<()> {
        self.scores.flush()?;
        self.relevance.flush()?;
        Ok(())
    }
}

/// Per-predecessor authority-flow share: a second-order polynomial in `r`
/// through `(0, 0)`, `(0.5, 1/(N+1))`, `(1, 1/N)`, clamped so neither a
/// predecessor's share nor the virtual page's residual share can go
/// negative — the anchor fit can dip slightly below zero for `r` near 0
/// at large N.
fn z_share(r: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let r = clamp_f64(r, 0.0, 1.0);
    let z = 2.0 * r / n * (2.0 * n / (n + 1.0) * (1.0 - r) + (r - 0.5));
    let mut z = z.max(0.0);
    if z * n > 1.0 {
        warn!("opic: clamped z*N to 1.0 (r={r}, N={n})");
        z = 1.0 / n;
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(b: u8) -> PageId {
        PageId::new(vec![b]).unwrap()
    }

    #[test]
    fn z_share_anchor_points() {
        assert_eq!(z_share(0.0, 4), 0.0);
        assert!((z_share(1.0, 4) - 0.25).abs() < 1e-9);
        assert!((z_share(0.5, 4) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn z_share_never_negative_or_overshooting() {
        for n in [1usize, 2, 5, 50] {
            for i in 0..=10 {
                let r = i as f64 / 10.0;
                let z = z_share(r, n);
                assert!(z >= 0.0);
                assert!(z * n as f64 <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn single_page_hub_update_sends_all_cash_to_virtual_page() {
        let mut graph = GraphStore::open(None).unwrap();
        graph.add_node(&pid(1));
        let mut engine = OpicHits::open(None, &graph, None, 20).unwrap();
        engine.update(1, &graph);
        let (h, _) = engine.get_scores(&pid(1));
        assert!(h >= 0.0);
    }

    #[test]
    fn hub_with_two_links_recognised_as_stronger_hub() {
        // A page linking to many authorities should end up with a higher
        // relative hub score than an isolated page.
        let mut graph = GraphStore::open(None).unwrap();
        graph.add_edge(&pid(1), &pid(10));
        graph.add_edge(&pid(1), &pid(11));
        graph.add_edge(&pid(1), &pid(12));
        graph.add_node(&pid(2));

        let mut engine = OpicHits::open(None, &graph, None, 20).unwrap();
        engine.update(25, &graph);

        let (h1, _) = engine.get_scores(&pid(1));
        let (h2, _) = engine.get_scores(&pid(2));
        assert!(h1 > h2, "hub h={h1} isolated h={h2}");
    }

    #[test]
    fn cash_is_approximately_conserved_across_an_update() {
        let mut graph = GraphStore::open(None).unwrap();
        graph.add_edge(&pid(1), &pid(2));
        graph.add_edge(&pid(2), &pid(3));
        graph.add_edge(&pid(3), &pid(1));
        let mut engine = OpicHits::open(None, &graph, None, 20).unwrap();

        let total_before: f64 = engine
            .scores
            .iter()
            .map(|(_, r)| r.h_cash + r.a_cash)
            .sum::<f64>()
            + {
                let vp = engine.scores.virtual_page();
                vp.h_cash + vp.a_cash
            };

        engine.update(5, &graph);

        let total_after: f64 = engine
            .scores
            .iter()
            .map(|(_, r)| r.h_cash + r.a_cash)
            .sum::<f64>()
            + {
                let vp = engine.scores.virtual_page();
                vp.h_cash + vp.a_cash
            };

        assert!(
            (total_before - total_after).abs() < 1e-6,
            "before={total_before} after={total_after}"
        );
    }

    #[test]
    fn mark_update_guarantees_drain_even_with_no_cash_advantage() {
        let mut graph = GraphStore::open(None).unwrap();
        for i in 0..50u8 {
            graph.add_node(&pid(i));
        }
        let mut engine = OpicHits::open(None, &graph, None, 1).unwrap();
        let target = pid(49);
        engine.mark_update(&target);
        let (hub_updates, auth_updates) = engine.update(1, &graph);
        assert!(hub_updates.contains(&target));
        assert!(auth_updates.contains(&target));
    }
}
