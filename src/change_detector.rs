//! change_detector — classifies a fetch as NEW / EQUAL / UPDATED (L3).
//!
//! Digests are SHA-256, not SHA-1 or a rolling CDC hash: the crate already
//! depends on `sha2` elsewhere, so reusing it avoids a second hashing crate
//! for what is here just an opaque fixed-size fingerprint.

use sha2::{Digest, Sha256};

use crate::hash_store::HashStore;
use crate::ids::PageId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeKind {
    New,
    Equal,
    Updated,
}

pub struct ChangeDetector {
    hashes: HashStore,
}

impl ChangeDetector {
    pub fn new(hashes: HashStore) -> Self {
        Self { hashes }
    }

    /// Digest `body`, compare against the stored digest for `p`, and store
    /// the new digest. The first time a page is seen this is always `New`.
    pub fn classify(&mut self, p: &PageId, body: &[u8]) -> ChangeKind {
        let digest = digest_of(body);
        let kind = match self.hashes.get(p) {
            None => ChangeKind::New,
            Some(prev) if prev == digest.as_slice() => ChangeKind::Equal,
            Some(_) => ChangeKind::Updated,
        };
        self.hashes.set(p, digest);
        kind
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.hashes.flush()
    }
}

fn digest_of(body: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hasher.finalize().to_vec()
}
