//! freq_store — deficit-round-robin-style refresh scheduler (L3).
//!
//! Every page carries a desired refresh frequency (Hz) and a `score`: the
//! virtual-time deadline at which it is next due. `get_next_pages` always
//! returns the pages with the smallest score and pushes their score forward
//! by `1/frequency`, so a page requested twice as often earns half the
//! deficit per visit and naturally falls behind pages with a larger
//! frequency.

use std::path::Path;

use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::consts::FREQ_FILE;
use crate::ids::PageId;
use crate::store::Table;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FreqRow {
    pub frequency: f64,
    pub score: f64,
}

pub struct FreqStore {
    rows: Table<PageId, FreqRow>,
}

impl FreqStore {
    pub fn open(workdir: Option<&Path>) -> Result<Self> {
        let path = workdir.map(|d| d.join(FREQ_FILE));
        Ok(Self {
            rows: Table::open(path.as_deref())?,
        })
    }

    pub fn contains(&self, p: &PageId) -> bool {
        self.rows.contains(p)
    }

    pub fn get(&self, p: &PageId) -> Option<&FreqRow> {
        self.rows.get(p)
    }

    /// Associate `frequency` with `p`. A non-positive frequency is a no-op
    /// (logged, not an error: a caller asking for "never" should use
    /// `delete` instead). `fresh` controls whether the page starts owing its
    /// first interval immediately (`fresh = true`, the common case for a
    /// page just discovered) or is considered already due (`fresh = false`,
    /// e.g. when re-deriving frequency for a page that was already overdue).
    /// Existing rows are left untouched, matching `INSERT OR IGNORE`.
    pub fn add(&mut self, p: &PageId, frequency: f64, fresh: bool) {
        if frequency <= 0.0 {
            warn!("freq_store: ignoring non-positive frequency for page");
            return;
        }
        if self.rows.contains(p) {
            return;
        }
        let mut score = self.min_score();
        if fresh {
            score += 1.0 / frequency;
        }
        self.rows.upsert(p.clone(), FreqRow { frequency, score });
    }

    /// Change `p`'s frequency, preserving its place in the schedule:
    /// `score` is shifted by `-1/old_frequency + 1/new_frequency` rather
    /// than reset, so a frequency bump does not reward or penalise a page
    /// for cycles it already waited out. `frequency <= 0` deletes the row.
    /// An unknown page is equivalent to `add(p, frequency, fresh = true)`.
    pub fn set(&mut self, p: &PageId, frequency: f64) {
        if frequency <= 0.0 {
            self.delete(p);
            return;
        }
        if let Some(row) = self.rows.get_mut(p) {
            row.score = row.score - 1.0 / row.frequency + 1.0 / frequency;
            row.frequency = frequency;
        } else {
            self.add(p, frequency, true);
        }
    }

    pub fn delete(&mut self, p: &PageId) {
        self.rows.delete(p);
    }

    /// Force an already-known page to the front of the schedule by setting
    /// its score to 0 (a no-op if `p` is unknown — seeding a brand-new page
    /// relies on OpicHits cash ranking instead, not this store).
    pub fn force_due(&mut self, p: &PageId) {
        if let Some(row) = self.rows.get_mut(p) {
            row.score = 0.0;
        }
    }

    /// The `n` most-overdue pages (smallest score), each then pushed
    /// forward by one period (`score += 1/frequency`) so the same page is
    /// not returned again until its next period elapses.
    pub fn get_next_pages(&mut self, n: usize) -> Vec<PageId> {
        let due = self.rows.bottom_n_by(n, |_, r| r.score);
        for p in &due {
            if let Some(row) = self.rows.get_mut(p) {
                row.score += 1.0 / row.frequency;
            }
        }
        due
    }

    fn min_score(&self) -> f64 {
        self.rows
            .iter()
            .map(|(_, r)| r.score)
            .fold(None, |acc, s| match acc {
                None => Some(s),
                Some(a) if s < a => Some(s),
                acc => acc,
            })
            .unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn flush(&mut self) -> Result<()> {
        self.rows.flush()
    }
}
