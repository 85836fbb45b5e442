//! updates — per-page `(first_seen, last_seen, n_updates)` rows (L2).

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::consts::UPDATES_FILE;
use crate::ids::PageId;
use crate::store::Table;
use crate::util::now_secs;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UpdateRow {
    pub first_seen: u64,
    pub last_seen: u64,
    pub n_updates: u64,
}

pub struct UpdatesStore {
    rows: Table<PageId, UpdateRow>,
}

impl UpdatesStore {
    pub fn open(workdir: Option<&Path>) -> Result<Self> {
        let path = workdir.map(|d| d.join(UPDATES_FILE));
        Ok(Self {
            rows: Table::open(path.as_deref())?,
        })
    }

    pub fn get(&self, p: &PageId) -> Option<&UpdateRow> {
        self.rows.get(p)
    }

    /// Record a fetch outcome: creates the row on first sight, otherwise
    /// bumps `last_seen` and, if `changed`, `n_updates`.
    pub fn record_fetch(&mut self, p: &PageId, changed: bool) {
        let now = now_secs();
        match self.rows.get_mut(p) {
            Some(row) => {
                row.last_seen = now;
                if changed {
                    row.n_updates += 1;
                }
            }
            None => {
                self.rows.upsert(
                    p.clone(),
                    UpdateRow {
                        first_seen: now,
                        last_seen: now,
                        n_updates: 0,
                    },
                );
            }
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn flush(&mut self) -> Result<()> {
        self.rows.flush()
    }
}
