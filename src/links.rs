//! links — per-edge weights `(w1, w2)`, opaque to the core (L2).
//!
//! Kept separate from `GraphStore` because the graph's adjacency is the
//! algorithm's read path (hot, queried every iteration) while edge weights
//! are caller-supplied payload the algorithm never looks at — splitting
//! them keeps the hot table small and lets a caller update a weight without
//! touching adjacency.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::consts::LINKS_FILE;
use crate::ids::PageId;
use crate::store::Table;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub w1: f64,
    pub w2: f64,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct EdgeKey(PageId, PageId);

pub struct LinksStore {
    rows: Table<EdgeKey, EdgeWeight>,
}

impl LinksStore {
    pub fn open(workdir: Option<&Path>) -> Result<Self> {
        let path = workdir.map(|d| d.join(LINKS_FILE));
        Ok(Self {
            rows: Table::open(path.as_deref())?,
        })
    }

    /// Idempotent when weights match the existing row: an identical
    /// `(src, dst, w1, w2)` tuple changes nothing.
    pub fn set(&mut self, src: &PageId, dst: &PageId, weight: EdgeWeight) {
        let key = EdgeKey(src.clone(), dst.clone());
        if self.rows.get(&key) != Some(&weight) {
            self.rows.upsert(key, weight);
        }
    }

    pub fn get(&self, src: &PageId, dst: &PageId) -> Option<EdgeWeight> {
        self.rows.get(&EdgeKey(src.clone(), dst.clone())).copied()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn flush(&mut self) -> Result<()> {
        self.rows.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let mut s = LinksStore::open(None).unwrap();
        let (u, v) = (PageId::new(vec![1]).unwrap(), PageId::new(vec![2]).unwrap());
        s.set(&u, &v, EdgeWeight { w1: 0.5, w2: 1.0 });
        assert_eq!(s.get(&u, &v), Some(EdgeWeight { w1: 0.5, w2: 1.0 }));
        assert_eq!(s.get(&v, &u), None);
    }

    #[test]
    fn identical_set_is_idempotent() {
        let mut s = LinksStore::open(None).unwrap();
        let (u, v) = (PageId::new(vec![1]).unwrap(), PageId::new(vec![2]).unwrap());
        let w = EdgeWeight { w1: 0.5, w2: 1.0 };
        s.set(&u, &v, w);
        s.set(&u, &v, w);
        assert_eq!(s.get(&u, &v), Some(w));
    }
}
