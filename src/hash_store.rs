//! hash_store — page id → content digest (L2), the storage half of
//! `ChangeDetector`. A plain map; not-found is `None`, never an error.

use std::path::Path;

use anyhow::Result;

use crate::consts::HASHES_FILE;
use crate::ids::PageId;
use crate::store::Table;

pub struct HashStore {
    rows: Table<PageId, Vec<u8>>,
}

impl HashStore {
    pub fn open(workdir: Option<&Path>) -> Result<Self> {
        let path = workdir.map(|d| d.join(HASHES_FILE));
        Ok(Self {
            rows: Table::open(path.as_deref())?,
        })
    }

    pub fn get(&self, p: &PageId) -> Option<&[u8]> {
        self.rows.get(p).map(|v| v.as_slice())
    }

    pub fn set(&mut self, p: &PageId, digest: Vec<u8>) {
        self.rows.upsert(p.clone(), digest);
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
    fn unknown_page_is_none() {
        let s = HashStore::open(None).unwrap();
        assert!(s.get(&PageId::new(vec![1]).unwrap()).is_none());
    }

    #[test]
    fn clear_removes_everything() {
        let mut s = HashStore::open(None).unwrap();
        let p = PageId::new(vec![1]).unwrap();
        s.set(&p, vec![0xAA]);
        s.clear();
        assert!(s.get(&p).is_none());
    }
}
