//! Centralized configuration and builder for the frontier core.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - `FrontierConfig::from_env()` reads a fixed set of `FRONTIER_*` keys,
//!   plus two ambient additions (`BATCH_MULTIPLIER`, `REFRESH_CEILING`)
//!   the crate itself needed and so exposed rather than burying as a
//!   magic number.
//! - `FrontierConfigBuilder` is the fluent, non-env-reading counterpart, for
//!   callers (tests, embedders) that want to construct a config in code.

use std::fmt;
use std::path::PathBuf;

use crate::consts::{
    DEFAULT_BATCH_MULTIPLIER, ENV_BATCH_MULTIPLIER, ENV_DOMAIN_DEPTH, ENV_IN_MEMORY,
    ENV_MAX_NEXT_REQUESTS, ENV_MIN_NEXT_PAGES, ENV_REFRESH_CEILING, ENV_TIME_WINDOW, ENV_WORKDIR,
};

/// Top-level configuration for the frontier core.
#[derive(Clone, Debug)]
pub struct FrontierConfig {
    /// `IN_MEMORY` — if true, all stores are volatile; `workdir` is ignored.
    pub in_memory: bool,

    /// `WORKDIR` — filesystem directory for persistent stores.
    pub workdir: PathBuf,

    /// `MIN_NEXT_PAGES` — floor of pending-queue refill size.
    pub min_next_pages: usize,

    /// `MAX_NEXT_REQUESTS` — cap per `get_next_requests` call.
    pub max_next_requests: usize,

    /// `TIME_WINDOW` — if set, enables the leaky-integrator history
    /// roll-up window.
    pub time_window: Option<f64>,

    /// `DOMAIN_DEPTH` — optional cutoff on per-domain link-hop depth when
    /// enqueueing new discoveries.
    pub domain_depth: Option<u32>,

    /// `BATCH_MULTIPLIER` — the k-factor of the selection policy: a batch
    /// touches `BATCH_MULTIPLIER * max(1, |must_update|)` pages.
    pub batch_multiplier: usize,

    /// `REFRESH_CEILING` — cap on re-crawl candidates drawn from FreqStore
    /// per `get_next_requests` call; `None` means unbounded (governed only
    /// by the requested count).
    pub refresh_ceiling: Option<usize>,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            in_memory: false,
            workdir: PathBuf::from("."),
            min_next_pages: 16,
            max_next_requests: 64,
            time_window: None,
            domain_depth: None,
            batch_multiplier: DEFAULT_BATCH_MULTIPLIER,
            refresh_ceiling: None,
        }
    }
}

impl FrontierConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var(ENV_IN_MEMORY) {
            cfg.in_memory = parse_bool(&v, cfg.in_memory);
        }
        if let Ok(v) = std::env::var(ENV_WORKDIR) {
            cfg.workdir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var(ENV_MIN_NEXT_PAGES) {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.min_next_pages = n;
            }
        }
        if let Ok(v) = std::env::var(ENV_MAX_NEXT_REQUESTS) {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.max_next_requests = n;
            }
        }
        if let Ok(v) = std::env::var(ENV_TIME_WINDOW) {
            cfg.time_window = v.trim().parse::<f64>().ok();
        }
        if let Ok(v) = std::env::var(ENV_DOMAIN_DEPTH) {
            cfg.domain_depth = v.trim().parse::<u32>().ok();
        }
        if let Ok(v) = std::env::var(ENV_BATCH_MULTIPLIER) {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.batch_multiplier = n;
                }
            }
        }
        if let Ok(v) = std::env::var(ENV_REFRESH_CEILING) {
            cfg.refresh_ceiling = v.trim().parse::<usize>().ok();
        }

        cfg
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => true,
        "0" | "false" | "off" | "no" => false,
        _ => default,
    }
}

/// Fluent builder producing a `FrontierConfig`, for callers that prefer
/// constructing configuration in code over environment variables.
#[derive(Clone, Debug)]
pub struct FrontierConfigBuilder {
    cfg: FrontierConfig,
}

impl Default for FrontierConfigBuilder {
    fn default() -> Self {
        Self {
            cfg: FrontierConfig::from_env(),
        }
    }
}

impl FrontierConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: FrontierConfig::default(),
        }
    }

    pub fn in_memory(mut self, on: bool) -> Self {
        self.cfg.in_memory = on;
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg.workdir = dir.into();
        self
    }

    pub fn min_next_pages(mut self, n: usize) -> Self {
        self.cfg.min_next_pages = n;
        self
    }

    pub fn max_next_requests(mut self, n: usize) -> Self {
        self.cfg.max_next_requests = n;
        self
    }

    pub fn time_window(mut self, w: Option<f64>) -> Self {
        self.cfg.time_window = w;
        self
    }

    pub fn domain_depth(mut self, d: Option<u32>) -> Self {
        self.cfg.domain_depth = d;
        self
    }

    pub fn batch_multiplier(mut self, k: usize) -> Self {
        if k > 0 {
            self.cfg.batch_multiplier = k;
        }
        self
    }

    pub fn refresh_ceiling(mut self, c: Option<usize>) -> Self {
        self.cfg.refresh_ceiling = c;
        self
    }

    pub fn build(self) -> FrontierConfig {
        self.cfg
    }
}

impl fmt::Display for FrontierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrontierConfig {{ in_memory: {}, workdir: {}, min_next_pages: {}, max_next_requests: {}, \
             time_window: {}, domain_depth: {}, batch_multiplier: {}, refresh_ceiling: {} }}",
            self.in_memory,
            self.workdir.display(),
            self.min_next_pages,
            self.max_next_requests,
            self.time_window
                .map(|w| w.to_string())
                .unwrap_or_else(|| "none(cumulative)".to_string()),
            self.domain_depth
                .map(|d| d.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.batch_multiplier,
            self.refresh_ceiling
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unbounded".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_time_window() {
        let cfg = FrontierConfig::default();
        assert!(cfg.time_window.is_none());
        assert_eq!(cfg.batch_multiplier, DEFAULT_BATCH_MULTIPLIER);
    }

    #[test]
    fn builder_overrides_defaults() {
        let cfg = FrontierConfigBuilder::from_default()
            .in_memory(true)
            .max_next_requests(8)
            .batch_multiplier(5)
            .build();
        assert!(cfg.in_memory);
        assert_eq!(cfg.max_next_requests, 8);
        assert_eq!(cfg.batch_multiplier, 5);
    }

    #[test]
    fn batch_multiplier_zero_is_ignored() {
        let cfg = FrontierConfigBuilder::from_default()
            .batch_multiplier(0)
            .build();
        assert_eq!(cfg.batch_multiplier, DEFAULT_BATCH_MULTIPLIER);
    }
}
