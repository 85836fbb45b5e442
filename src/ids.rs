//! ids — the PageId type shared by every store.
//!
//! A PageId is an opaque, non-empty byte string. The core never hashes URLs
//! itself; the caller (crawler glue) supplies a fingerprint and we treat it
//! as bytes, exact-equal, byte-lexicographically ordered so every store that
//! needs a deterministic tie-break (FreqStore selection, heap iteration)
//! gets one for free without an extra sequence counter.

use std::fmt;

use anyhow::{bail, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(Vec<u8>);

impl PageId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            bail!("PageId must be non-empty");
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", STANDARD.encode(&self.0))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", STANDARD.encode(&self.0))
    }
}

impl TryFrom<&str> for PageId {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self> {
        PageId::new(s.as_bytes().to_vec())
    }
}

impl TryFrom<String> for PageId {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        PageId::new(s.into_bytes())
    }
}

/// Display label for the virtual sink/source page (⊥). Kept as a distinct
/// constant rather than a reserved PageId value so it can never collide
/// with a caller-supplied fingerprint.
pub const VIRTUAL_PAGE_LABEL: &str = "\u{22a5}";
