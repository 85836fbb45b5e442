//! backend — the facade implementing the crawler-boundary contract (L5).
//!
//! Owns every store plus the OpicHits engine, the ChangeDetector and the
//! FreqEstimator, and is the only thing a crawl manager talks to: seed,
//! report a crawl, ask for the next batch of requests. Single-writer,
//! single-threaded — every operation here is expected to be called
//! serially from one caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::change_detector::{ChangeDetector, ChangeKind};
use crate::config::FrontierConfig;
use crate::freq_estimator::{FreqEstimator, SystemClock};
use crate::freq_store::FreqStore;
use crate::graph::GraphStore;
use crate::hash_store::HashStore;
use crate::ids::PageId;
use crate::links::{EdgeWeight, LinksStore};
use crate::opic::OpicHits;
use crate::page_meta::{PageMeta, PageMetaStore};
use crate::store::{top_n_from_scored, SingletonFile};
use crate::updates::UpdatesStore;

/// One outstanding fetch request. `page_id` is the fingerprint the crawler
/// glue computed for `url` — this core never hashes URLs itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawlRequest {
    pub page_id: PageId,
    pub url: String,
}

/// A link discovered while crawling `response`'s page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub page_id: PageId,
    pub url: String,
    pub domain: String,
    pub weight: EdgeWeight,
}

/// The outcome of fetching a previously requested page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawlResponse {
    pub page_id: PageId,
    pub url: String,
    pub domain: String,
    pub body: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    ConnectionRefused,
    HttpStatus(u16),
    Other,
}

pub struct Backend {
    cfg: FrontierConfig,
    graph: GraphStore,
    page_meta: PageMetaStore,
    links: LinksStore,
    updates: UpdatesStore,
    change_detector: ChangeDetector,
    freq_estimator: FreqEstimator<SystemClock>,
    freq_store: FreqStore,
    opic: OpicHits,
    /// Discovered-but-not-yet-drained page ids, removed once drawn by
    /// `get_next_requests`.
    pending: SingletonFile<BTreeMap<PageId, ()>>,
    /// Link-hop depth from the nearest seed, keyed by page id. Unlike
    /// `pending`, entries here are never removed — a page's depth must
    /// still be known after it is drawn and crawled, so its own outgoing
    /// links can be depth-checked correctly.
    depths: SingletonFile<BTreeMap<PageId, u32>>,
    closed: bool,
}

impl Backend {
    /// `frontier_start`: open/create every store, restore the cash deltas
    /// and virtual clock, and make sure every existing graph node has a
    /// score row.
    pub fn start(cfg: FrontierConfig) -> Result<Self> {
        let workdir: Option<PathBuf> = if cfg.in_memory {
            None
        } else {
            fs::create_dir_all(&cfg.workdir)
                .with_context(|| format!("create workdir {}", cfg.workdir.display()))?;
            Some(cfg.workdir.clone())
        };
        let workdir = workdir.as_deref();

        let graph = GraphStore::open(workdir)?;
        let opic = OpicHits::open(workdir, &graph, cfg.time_window, cfg.batch_multiplier)?;
        let pending_path = workdir.map(|d| d.join(crate::consts::PENDING_FILE));
        let depth_path = workdir.map(|d| d.join(crate::consts::DEPTH_FILE));

        info!("frontier_start: {cfg}");

        Ok(Self {
            graph,
            page_meta: PageMetaStore::open(workdir)?,
            links: LinksStore::open(workdir)?,
            updates: UpdatesStore::open(workdir)?,
            change_detector: ChangeDetector::new(HashStore::open(workdir)?),
            freq_estimator: FreqEstimator::new(SystemClock),
            freq_store: FreqStore::open(workdir)?,
            opic,
            pending: SingletonFile::open(pending_path.as_deref())?,
            depths: SingletonFile::open(depth_path.as_deref())?,
            closed: false,
            cfg,
        })
    }

    /// `frontier_stop`: flush and close every store.
    pub fn stop(&mut self) -> Result<()> {
        self.graph.flush()?;
        self.page_meta.flush()?;
        self.links.flush()?;
        self.updates.flush()?;
        self.change_detector.flush()?;
        self.freq_store.flush()?;
        self.opic.close()?;
        self.pending.flush()?;
        self.depths.flush()?;
        self.closed = true;
        info!("frontier_stop");
        Ok(())
    }

    pub fn add_seeds(&mut self, requests: &[CrawlRequest]) {
        for req in requests {
            self.graph.add_node(&req.page_id);
            self.opic.add_page(&req.page_id);
            self.page_meta.set(
                &req.page_id,
                PageMeta {
                    url: req.url.clone(),
                    domain: domain_of(&req.url),
                },
            );
            self.freq_store.force_due(&req.page_id);
            self.pending.modify(|p| {
                p.entry(req.page_id.clone()).or_insert(());
            });
            self.depths.modify(|d| {
                d.entry(req.page_id.clone()).or_insert(0);
            });
            debug!("add_seeds: seeded {}", req.page_id);
        }
    }

    /// `page_crawled`: record the fetch outcome and advance the engine by
    /// one iteration.
    pub fn page_crawled(&mut self, response: &CrawlResponse, links: &[DiscoveredLink]) {
        let kind = self.change_detector.classify(&response.page_id, &response.body);
        self.page_meta.set(
            &response.page_id,
            PageMeta {
                url: response.url.clone(),
                domain: response.domain.clone(),
            },
        );
        self.updates
            .record_fetch(&response.page_id, kind != ChangeKind::Equal);
        self.freq_estimator
            .refresh(&response.page_id, kind != ChangeKind::Equal);
        self.opic.mark_update(&response.page_id);

        let parent_depth = self
            .depths
            .get()
            .get(&response.page_id)
            .copied()
            .unwrap_or(0);
        self.pending.modify(|p| {
            p.remove(&response.page_id);
        });

        for link in links {
            self.graph.add_edge(&response.page_id, &link.page_id);
            self.links.set(&response.page_id, &link.page_id, link.weight);
            let is_new = self.opic.add_page(&link.page_id);
            if is_new {
                self.opic.mark_update(&link.page_id);
            }
            self.page_meta.set(
                &link.page_id,
                PageMeta {
                    url: link.url.clone(),
                    domain: link.domain.clone(),
                },
            );

            if !is_new {
                continue;
            }

            let depth = parent_depth + 1;
            self.depths.modify(|d| {
                d.entry(link.page_id.clone()).or_insert(depth);
            });

            let within_depth = self.cfg.domain_depth.map_or(true, |max| depth <= max);
            if within_depth {
                self.pending.modify(|p| {
                    p.entry(link.page_id.clone()).or_insert(());
                });
            } else {
                debug!(
                    "page_crawled: {} beyond domain depth {:?}, graphed but not enqueued",
                    link.page_id, self.cfg.domain_depth
                );
            }
        }

        self.opic.update(1, &self.graph);

        if let Some(freq) = self.freq_estimator.frequency(&response.page_id) {
            self.freq_store.set(&response.page_id, freq);
        }

        debug!(
            "page_crawled: {} classified {:?}, {} links discovered",
            response.page_id,
            kind,
            links.len()
        );
    }

    /// `request_error`: optional outcome path. Treated as a missed refresh;
    /// no graph mutation.
    pub fn request_error(&mut self, request: &CrawlRequest, kind: ErrorKind) {
        self.freq_estimator.refresh(&request.page_id, false);
        debug!("request_error: {} ({:?})", request.page_id, kind);
    }

    /// `get_next_requests`: fill up to `max_n` from FreqStore re-crawl
    /// candidates (capped by `REFRESH_CEILING` if configured), then the
    /// remainder from new-page candidates ranked by combined cash.
    pub fn get_next_requests(&mut self, max_n: usize) -> Vec<CrawlRequest> {
        if max_n == 0 {
            return Vec::new();
        }

        let refresh_quota = self.cfg.refresh_ceiling.unwrap_or(max_n).min(max_n);
        let due = self.freq_store.get_next_pages(refresh_quota);
        let mut out: Vec<CrawlRequest> = Vec::with_capacity(max_n);
        for p in due {
            if let Some(req) = self.request_for(&p) {
                out.push(req);
            }
        }

        let remaining = max_n - out.len();
        if remaining > 0 {
            let pending = self.pending.get().clone();
            let scored = pending.keys().map(|p| {
                let (h, a) = self.opic.cash(p);
                (p.clone(), h + a)
            });
            let picked = top_n_from_scored(scored, remaining);
            for p in picked {
                if let Some(req) = self.request_for(&p) {
                    out.push(req);
                }
                self.pending.modify(|m| {
                    m.remove(&p);
                });
            }
        }

        out.truncate(max_n);
        out
    }

    fn request_for(&self, p: &PageId) -> Option<CrawlRequest> {
        self.page_meta.get(p).map(|meta| CrawlRequest {
            page_id: p.clone(),
            url: meta.url.clone(),
        })
    }

    pub fn get_scores(&self, p: &PageId) -> (f64, f64) {
        self.opic.get_scores(p)
    }

    /// Raw `(h_cash, a_cash)` currently held by the virtual page (⊥, see
    /// [`crate::ids::VIRTUAL_PAGE_LABEL`]), the shared stand-in for the
    /// rest of the web every real page also drains cash into.
    pub fn virtual_cash(&self) -> (f64, f64) {
        self.opic.virtual_cash()
    }

    pub fn set_relevance(&mut self, p: &PageId, r: f64) {
        self.opic.set_relevance(p, r);
    }
}

impl Drop for Backend {
    /// Best-effort flush on an un-stopped facade: a panicking caller
    /// still leaves a consistent working directory behind.
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.stop();
        }
    }
}

fn domain_of(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrontierConfigBuilder;

    fn pid(b: u8) -> PageId {
        PageId::new(vec![b]).unwrap()
    }

    fn cfg() -> FrontierConfig {
        FrontierConfigBuilder::from_default().in_memory(true).build()
    }

    #[test]
    fn domain_of_strips_scheme_and_path() {
        assert_eq!(domain_of("https://example.com/a/b"), "example.com");
        assert_eq!(domain_of("example.com/a"), "example.com");
    }

    #[test]
    fn seeded_pages_are_returned_as_new_candidates() {
        let mut b = Backend::start(cfg()).unwrap();
        b.add_seeds(&[CrawlRequest {
            page_id: pid(1),
            url: "https://example.com/".into(),
        }]);
        let reqs = b.get_next_requests(10);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].page_id, pid(1));
    }

    #[test]
    fn get_next_requests_never_repeats_a_drained_page_within_a_session() {
        let mut b = Backend::start(cfg()).unwrap();
        b.add_seeds(&[
            CrawlRequest {
                page_id: pid(1),
                url: "https://a.example/".into(),
            },
            CrawlRequest {
                page_id: pid(2),
                url: "https://b.example/".into(),
            },
        ]);
        let first = b.get_next_requests(10);
        let second = b.get_next_requests(10);
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
    }

    #[test]
    fn page_crawled_enqueues_discovered_links() {
        let mut b = Backend::start(cfg()).unwrap();
        let seed = CrawlRequest {
            page_id: pid(1),
            url: "https://a.example/".into(),
        };
        b.add_seeds(&[seed.clone()]);
        let _ = b.get_next_requests(10);

        b.page_crawled(
            &CrawlResponse {
                page_id: pid(1),
                url: seed.url.clone(),
                domain: "a.example".into(),
                body: b"hello".to_vec(),
            },
            &[DiscoveredLink {
                page_id: pid(2),
                url: "https://a.example/2".into(),
                domain: "a.example".into(),
                weight: EdgeWeight { w1: 1.0, w2: 1.0 },
            }],
        );

        let next = b.get_next_requests(10);
        assert!(next.iter().any(|r| r.page_id == pid(2)));
    }

    #[test]
    fn relinking_an_already_crawled_page_does_not_requeue_it() {
        let mut b = Backend::start(cfg()).unwrap();
        b.add_seeds(&[
            CrawlRequest {
                page_id: pid(1),
                url: "https://a.example/".into(),
            },
            CrawlRequest {
                page_id: pid(2),
                url: "https://a.example/2".into(),
            },
        ]);
        let _ = b.get_next_requests(10);

        b.page_crawled(
            &CrawlResponse {
                page_id: pid(1),
                url: "https://a.example/".into(),
                domain: "a.example".into(),
                body: b"hello".to_vec(),
            },
            &[],
        );
        b.page_crawled(
            &CrawlResponse {
                page_id: pid(2),
                url: "https://a.example/2".into(),
                domain: "a.example".into(),
                body: b"world".to_vec(),
            },
            &[DiscoveredLink {
                page_id: pid(1),
                url: "https://a.example/".into(),
                domain: "a.example".into(),
                weight: EdgeWeight { w1: 1.0, w2: 1.0 },
            }],
        );

        let next = b.get_next_requests(10);
        assert!(
            !next.iter().any(|r| r.page_id == pid(1)),
            "already-crawled page 1 must not be re-queued as a new candidate just because page 2 linked back to it"
        );
    }
}
