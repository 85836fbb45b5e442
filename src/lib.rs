//! frontier-core — OPIC-HITS ranking and adaptive refresh scheduling for a
//! web-crawl frontier.
//!
//! Layout, leaves first:
//! - `ids`, `store`          — PageId and the generic KV-over-indexed-store.
//! - `graph`, `page_meta`, `links`, `hash_store`, `updates` — the plain L2
//!   stores (graph edges, URL/domain rows, per-edge weights, content
//!   digests, update-history rows).
//! - `hits_score`, `freq_store` — the two L2 stores with a non-trivial
//!   query shape (the cash-delta trick, the deficit-round-robin scheduler).
//! - `change_detector`, `freq_estimator` — L3 classifiers built on top of
//!   `hash_store`/`updates`.
//! - `opic`                  — the L4 cash-flow engine.
//! - `backend`               — the L5 facade implementing the external
//!   crawler-boundary contract.

pub mod config;
pub mod consts;
pub mod ids;
pub mod store;
pub mod util;

pub mod change_detector;
pub mod freq_estimator;
pub mod graph;
pub mod hash_store;
pub mod hits_score;
pub mod links;
pub mod page_meta;
pub mod updates;

pub mod freq_store;
pub mod opic;

pub mod backend;

pub use backend::{Backend, CrawlRequest, CrawlResponse, DiscoveredLink, ErrorKind};
pub use config::{FrontierConfig, FrontierConfigBuilder};
pub use ids::PageId;
pub use opic::OpicHits;
