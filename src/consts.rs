//! consts — tunables with no principled derivation, so they are named
//! constants (with an env override in `config.rs`) rather than buried
//! magic numbers, plus the filenames used by the persisted stores under
//! `WORKDIR`.

/// Default `k = BATCH_MULTIPLIER * max(1, |must_update|)` factor of the
/// OpicHits selection policy. Unexplained in the source; exposed as a
/// tunable rather than hardcoded.
pub const DEFAULT_BATCH_MULTIPLIER: usize = 20;

/// Relevance assumed for a page with no externally supplied relevance score:
/// "no information", the midpoint of `[0,1]`.
pub const DEFAULT_RELEVANCE: f64 = 0.5;

pub const ENV_IN_MEMORY: &str = "FRONTIER_IN_MEMORY";
pub const ENV_WORKDIR: &str = "FRONTIER_WORKDIR";
pub const ENV_MIN_NEXT_PAGES: &str = "FRONTIER_MIN_NEXT_PAGES";
pub const ENV_MAX_NEXT_REQUESTS: &str = "FRONTIER_MAX_NEXT_REQUESTS";
pub const ENV_TIME_WINDOW: &str = "FRONTIER_TIME_WINDOW";
pub const ENV_DOMAIN_DEPTH: &str = "FRONTIER_DOMAIN_DEPTH";
pub const ENV_BATCH_MULTIPLIER: &str = "FRONTIER_BATCH_MULTIPLIER";
pub const ENV_REFRESH_CEILING: &str = "FRONTIER_REFRESH_CEILING";

pub const ENGINE_STATE_FILE: &str = "engine_state.json";
pub const GRAPH_FWD_FILE: &str = "graph_fwd.json";
pub const GRAPH_REV_FILE: &str = "graph_rev.json";
pub const GRAPH_NODES_FILE: &str = "graph_nodes.json";
pub const SCORES_FILE: &str = "scores.json";
pub const RELEVANCE_FILE: &str = "relevance.json";
pub const PAGE_META_FILE: &str = "page_meta.json";
pub const LINKS_FILE: &str = "links.json";
pub const HASHES_FILE: &str = "hashes.json";
pub const UPDATES_FILE: &str = "updates.json";
pub const FREQ_FILE: &str = "freq.json";
pub const PENDING_FILE: &str = "pending.json";
pub const DEPTH_FILE: &str = "depth.json";
