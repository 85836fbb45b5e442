//! graph — directed multigraph of page-ids (L2).
//!
//! Stored as two adjacency tables (forward/successors, reverse/predecessors)
//! keyed by endpoint, not as linked objects — cycles need no special
//! handling, and there is no object-graph ownership to unwind. A third table
//! tracks nodes that may have no edges yet (a bare `add_node` from a seed).
//!
//! Multi-edges between the same `(u, v)` pair collapse to one adjacency
//! entry: the algorithm only cares about the successor/predecessor *set*,
//! and collapsing also gives `add_edge` its idempotence for free (repeated
//! `add_edge(u, v)` changes nothing after the first).

use std::path::Path;

use anyhow::Result;
use log::debug;

use crate::consts::{GRAPH_FWD_FILE, GRAPH_NODES_FILE, GRAPH_REV_FILE};
use crate::ids::PageId;
use crate::store::Table;

pub struct GraphStore {
    nodes: Table<PageId, ()>,
    forward: Table<PageId, Vec<PageId>>,
    reverse: Table<PageId, Vec<PageId>>,
}

impl GraphStore {
    pub fn open(workdir: Option<&Path>) -> Result<Self> {
        let nodes_path = workdir.map(|d| d.join(GRAPH_NODES_FILE));
        let fwd_path = workdir.map(|d| d.join(GRAPH_FWD_FILE));
        let rev_path = workdir.map(|d| d.join(GRAPH_REV_FILE));
        Ok(Self {
            nodes: Table::open(nodes_path.as_deref())?,
            forward: Table::open(fwd_path.as_deref())?,
            reverse: Table::open(rev_path.as_deref())?,
        })
    }

    /// Idempotent: true if `p` was not already known.
    pub fn add_node(&mut self, p: &PageId) -> bool {
        let added = self.nodes.insert_if_absent(p.clone(), ());
        if added {
            debug!("graph: new node {p}");
        }
        added
    }

    pub fn contains_node(&self, p: &PageId) -> bool {
        self.nodes.contains(p)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Cursor-style iteration over known node ids; borrows the store.
    pub fn nodes(&self) -> impl Iterator<Item = &PageId> {
        self.nodes.keys()
    }

    /// Idempotent: true if this exact `(src, dst)` pair was not already
    /// present. Self-loops are accepted (stored) but ignored by the
    /// ranking algorithm — that filtering happens in `opic`, not here.
    pub fn add_edge(&mut self, src: &PageId, dst: &PageId) -> bool {
        self.add_node(src);
        self.add_node(dst);

        let fwd_new = match self.forward.get_mut(src) {
            Some(list) => {
                if list.contains(dst) {
                    false
                } else {
                    list.push(dst.clone());
                    true
                }
            }
            None => {
                self.forward.upsert(src.clone(), vec![dst.clone()]);
                true
            }
        };

        match self.reverse.get_mut(dst) {
            Some(list) => {
                if !list.contains(src) {
                    list.push(src.clone());
                }
            }
            None => {
                self.reverse.upsert(dst.clone(), vec![src.clone()]);
            }
        }

        if fwd_new {
            debug!("graph: new edge {src} -> {dst}");
        }
        fwd_new
    }

    pub fn successors(&self, p: &PageId) -> Vec<PageId> {
        self.forward.get(p).cloned().unwrap_or_default()
    }

    pub fn predecessors(&self, p: &PageId) -> Vec<PageId> {
        self.reverse.get(p).cloned().unwrap_or_default()
    }

    pub fn out_degree(&self, p: &PageId) -> usize {
        self.forward.get(p).map(|v| v.len()).unwrap_or(0)
    }

    pub fn in_degree(&self, p: &PageId) -> usize {
        self.reverse.get(p).map(|v| v.len()).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn flush(&mut self) -> Result<()> {
        self.nodes.flush()?;
        self.forward.flush()?;
        self.reverse.flush()?;
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
    fn add_node_is_idempotent() {
        let mut g = GraphStore::open(None).unwrap();
        assert!(g.add_node(&pid(1)));
        assert!(!g.add_node(&pid(1)));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn add_edge_is_idempotent_and_builds_both_directions() {
        let mut g = GraphStore::open(None).unwrap();
        assert!(g.add_edge(&pid(1), &pid(2)));
        assert!(!g.add_edge(&pid(1), &pid(2)));

        assert_eq!(g.successors(&pid(1)), vec![pid(2)]);
        assert_eq!(g.predecessors(&pid(2)), vec![pid(1)]);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn unknown_page_has_empty_adjacency() {
        let g = GraphStore::open(None).unwrap();
        assert!(g.successors(&pid(9)).is_empty());
        assert!(g.predecessors(&pid(9)).is_empty());
    }

    #[test]
    fn self_loop_is_stored_without_special_casing() {
        let mut g = GraphStore::open(None).unwrap();
        g.add_edge(&pid(1), &pid(1));
        assert_eq!(g.successors(&pid(1)), vec![pid(1)]);
    }
}
