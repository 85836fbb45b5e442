//! page_meta — URL + domain rows, one per page id (L2).

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::consts::PAGE_META_FILE;
use crate::ids::PageId;
use crate::store::Table;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageMeta {
    pub url: String,
    pub domain: String,
}

pub struct PageMetaStore {
    rows: Table<PageId, PageMeta>,
}

impl PageMetaStore {
    pub fn open(workdir: Option<&Path>) -> Result<Self> {
        let path = workdir.map(|d| d.join(PAGE_META_FILE));
        Ok(Self {
            rows: Table::open(path.as_deref())?,
        })
    }

    /// Upsert page metadata. Re-discovery only overwrites the fields the
    /// caller actually supplies — callers that only know the URL pass the
    /// previously-known domain back in if they want it preserved.
    pub fn set(&mut self, p: &PageId, meta: PageMeta) {
        self.rows.upsert(p.clone(), meta);
    }

    pub fn get(&self, p: &PageId) -> Option<&PageMeta> {
        self.rows.get(p)
    }

    pub fn contains(&self, p: &PageId) -> bool {
        self.rows.contains(p)
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
        let mut s = PageMetaStore::open(None).unwrap();
        let p = PageId::new(vec![1]).unwrap();
        s.set(
            &p,
            PageMeta {
                url: "https://example.com/".into(),
                domain: "example.com".into(),
            },
        );
        let got = s.get(&p).unwrap();
        assert_eq!(got.url, "https://example.com/");
        assert_eq!(got.domain, "example.com");
    }
}
