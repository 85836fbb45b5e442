//! store — KV-over-indexed-store abstraction (L1).
//!
//! Every L2 store in this crate is a small typed table built on top of
//! [`Table`]: a key-ordered map that is fully read into memory on open and
//! fully (atomically) rewritten on flush, via the same tmp-then-rename
//! idiom [`SingletonFile`] uses for its single-row file. Deliberately
//! simple rather than a real LSM/B-tree engine: mutations are buffered
//! and must be flushed on close, which an in-memory table with a
//! write-back file satisfies exactly, and the sizes involved (pages,
//! edges, links) are the kind that comfortably fit in memory for a
//! single-process frontier.
//!
//! "Pick N rows with smallest/largest value of some index" is implemented
//! with a bounded heap (`top_n_by`) rather than a full sort, so the cost is
//! O(rows · log N) instead of O(rows · log rows).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A key-ordered table, optionally backed by a JSON file.
///
/// `path: None` is the `IN_MEMORY` configuration: nothing ever touches disk.
#[derive(Debug)]
pub struct Table<K, V> {
    path: Option<PathBuf>,
    rows: BTreeMap<K, V>,
    dirty: bool,
}

impl<K, V> Table<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Open (or create) a table backed by `path`. `None` means in-memory only.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let rows = match path {
            Some(p) if p.exists() => {
                let data = fs::read(p).with_context(|| format!("read table {}", p.display()))?;
                if data.is_empty() {
                    BTreeMap::new()
                } else {
                    let entries: Vec<(K, V)> = serde_json::from_slice(&data)
                        .with_context(|| format!("parse table {}", p.display()))?;
                    entries.into_iter().collect()
                }
            }
            _ => BTreeMap::new(),
        };

        Ok(Self {
            path: path.map(|p| p.to_path_buf()),
            rows,
            dirty: false,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, k: &K) -> bool {
        self.rows.contains_key(k)
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.rows.get(k)
    }

    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        self.dirty = true;
        self.rows.get_mut(k)
    }

    /// Insert only if absent. Returns true if the row was newly created.
    pub fn insert_if_absent(&mut self, k: K, v: V) -> bool {
        if self.rows.contains_key(&k) {
            false
        } else {
            self.rows.insert(k, v);
            self.dirty = true;
            true
        }
    }

    /// Insert or overwrite, returning the previous value if any.
    pub fn upsert(&mut self, k: K, v: V) -> Option<V> {
        self.dirty = true;
        self.rows.insert(k, v)
    }

    pub fn delete(&mut self, k: &K) -> Option<V> {
        let out = self.rows.remove(k);
        if out.is_some() {
            self.dirty = true;
        }
        out
    }

    pub fn clear(&mut self) {
        if !self.rows.is_empty() {
            self.dirty = true;
        }
        self.rows.clear();
    }

    /// Cursor-style iteration: borrows the table, cannot outlive it.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.rows.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.keys()
    }

    /// Pick the n rows with the largest `key_fn(k, v)`, without sorting the
    /// whole table. Ties are broken by `K`'s own ordering (ascending), which
    /// for `PageId` means byte-lexicographic — a stable, documented tie-break.
    pub fn top_n_by<F>(&self, n: usize, key_fn: F) -> Vec<K>
    where
        F: Fn(&K, &V) -> f64,
    {
        top_n_by_impl(self.rows.iter(), n, key_fn, true)
    }

    /// Pick the n rows with the smallest `key_fn(k, v)`.
    pub fn bottom_n_by<F>(&self, n: usize, key_fn: F) -> Vec<K>
    where
        F: Fn(&K, &V) -> f64,
    {
        top_n_by_impl(self.rows.iter(), n, key_fn, false)
    }

    /// Flush buffered mutations to disk (no-op for in-memory tables or when
    /// nothing changed since the last flush).
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(path) = &self.path {
            atomic_write_json(path, &self.rows.iter().collect::<Vec<_>>())?;
        }
        self.dirty = false;
        Ok(())
    }
}

/// Shared by `top_n_by`/`bottom_n_by`: a bounded heap that keeps the n best
/// candidates seen so far, discarding the current worst once full.
fn top_n_by_impl<'a, K, V, I, F>(iter: I, n: usize, key_fn: F, descending: bool) -> Vec<K>
where
    K: Ord + Clone + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
    F: Fn(&K, &V) -> f64,
{
    if n == 0 {
        return Vec::new();
    }

    // Heap always evicts its minimum `HeapKey`; for "top" (largest value
    // wins) we store the value as-is so the smallest-value candidate is
    // evicted first. For "bottom" (smallest value wins) we negate so the
    // largest-magnitude (least desirable) candidate is evicted first.
    let mut heap: BinaryHeap<HeapEntry<K>> = BinaryHeap::with_capacity(n + 1);
    for (k, v) in iter {
        let raw = key_fn(k, v);
        let order_key = if descending { raw } else { -raw };
        heap.push(HeapEntry {
            neg_key: -order_key,
            pk: k.clone(),
        });
        if heap.len() > n {
            heap.pop();
        }
    }

    let mut out: Vec<(f64, K)> = heap.into_iter().map(|e| (-e.neg_key, e.pk)).collect();
    out.sort_by(|a, b| match b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.1.cmp(&b.1),
        ord => ord,
    });
    out.into_iter().map(|(_, k)| k).collect()
}

/// Same bounded-heap technique as [`Table::top_n_by`], for callers picking
/// top-N over an ad-hoc scored set (e.g. a restricted candidate id list)
/// rather than a whole table.
pub fn top_n_from_scored<K: Ord + Clone>(items: impl Iterator<Item = (K, f64)>, n: usize) -> Vec<K> {
    if n == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<HeapEntry<K>> = BinaryHeap::with_capacity(n + 1);
    for (k, raw) in items {
        heap.push(HeapEntry { neg_key: -raw, pk: k });
        if heap.len() > n {
            heap.pop();
        }
    }
    let mut out: Vec<(f64, K)> = heap.into_iter().map(|e| (-e.neg_key, e.pk)).collect();
    out.sort_by(|a, b| match b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.1.cmp(&b.1),
        ord => ord,
    });
    out.into_iter().map(|(_, k)| k).collect()
}

struct HeapEntry<K> {
    /// Negated ordering key, so `BinaryHeap` (a max-heap) pops the row we'd
    /// actually want to evict (the current worst of the top-n) via `pop`.
    neg_key: f64,
    pk: K,
}

impl<K: Ord> PartialEq for HeapEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.neg_key == other.neg_key && self.pk == other.pk
    }
}
impl<K: Ord> Eq for HeapEntry<K> {}
impl<K: Ord> PartialOrd for HeapEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<K: Ord> Ord for HeapEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.neg_key
            .partial_cmp(&other.neg_key)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.pk.cmp(&other.pk))
    }
}

/// Write `value` to `path` atomically: serialize to a sibling `.tmp` file,
/// fsync it, then rename over the destination, so a crash mid-write never
/// leaves a half-written table behind.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("tmp");
    let bytes = serde_json::to_vec(value).context("serialize table")?;
    fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

/// A singleton (at most one logical row) JSON-backed value, used for the
/// cash-delta / virtual-clock persistence unit and for the facade's
/// discovered-but-undrained set.
#[derive(Debug)]
pub struct SingletonFile<T> {
    path: Option<PathBuf>,
    value: T,
    dirty: bool,
}

impl<T> SingletonFile<T>
where
    T: Default + Clone + Serialize + DeserializeOwned,
{
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let value = match path {
            Some(p) if p.exists() => {
                let data = fs::read(p).with_context(|| format!("read {}", p.display()))?;
                if data.is_empty() {
                    T::default()
                } else {
                    serde_json::from_slice(&data)
                        .with_context(|| format!("parse {}", p.display()))?
                }
            }
            _ => T::default(),
        };
        Ok(Self {
            path: path.map(|p| p.to_path_buf()),
            value,
            dirty: false,
        })
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    pub fn modify(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.dirty = true;
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(path) = &self.path {
            atomic_write_json(path, &self.value)?;
        }
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile_shim::TempDir;

    #[test]
    fn insert_if_absent_is_idempotent() {
        let mut t: Table<String, i32> = Table::open(None).unwrap();
        assert!(t.insert_if_absent("a".into(), 1));
        assert!(!t.insert_if_absent("a".into(), 2));
        assert_eq!(*t.get(&"a".to_string()).unwrap(), 1);
    }

    #[test]
    fn upsert_overwrites_and_returns_old() {
        let mut t: Table<String, i32> = Table::open(None).unwrap();
        assert_eq!(t.upsert("a".into(), 1), None);
        assert_eq!(t.upsert("a".into(), 2), Some(1));
        assert_eq!(*t.get(&"a".to_string()).unwrap(), 2);
    }

    #[test]
    fn top_n_by_picks_largest() {
        let mut t: Table<String, f64> = Table::open(None).unwrap();
        for (k, v) in [("a", 1.0), ("b", 5.0), ("c", 3.0), ("d", 5.0)] {
            t.upsert(k.into(), v);
        }
        let top2 = t.top_n_by(2, |_, v| *v);
        assert_eq!(top2, vec!["b".to_string(), "d".to_string()]);
    }

    #[test]
    fn bottom_n_by_picks_smallest() {
        let mut t: Table<String, f64> = Table::open(None).unwrap();
        for (k, v) in [("a", 1.0), ("b", 5.0), ("c", 3.0)] {
            t.upsert(k.into(), v);
        }
        let bottom1 = t.bottom_n_by(1, |_, v| *v);
        assert_eq!(bottom1, vec!["a".to_string()]);
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = TempDir::new();
        let path = dir.path().join("table.json");

        {
            let mut t: Table<String, i32> = Table::open(Some(&path)).unwrap();
            t.upsert("a".into(), 1);
            t.upsert("b".into(), 2);
            t.flush().unwrap();
        }

        let t: Table<String, i32> = Table::open(Some(&path)).unwrap();
        assert_eq!(*t.get(&"a".to_string()).unwrap(), 1);
        assert_eq!(*t.get(&"b".to_string()).unwrap(), 2);
        assert_eq!(t.len(), 2);
    }
}

/// Tiny std-only stand-in for a temp-dir helper, kept local to tests so the
/// crate does not take on a `tempfile` dev-dependency for a handful of
/// round-trip tests.
#[cfg(test)]
mod tempfile_shim {
    use std::path::{Path, PathBuf};

    pub struct TempDir(PathBuf);

    impl TempDir {
        pub fn new() -> Self {
            let pid = std::process::id();
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos();
            let path = std::env::temp_dir().join(format!("frontier-core-test-{pid}-{nanos}"));
            std::fs::create_dir_all(&path).unwrap();
            Self(path)
        }

        pub fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}
