use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use frontier_core::ids::VIRTUAL_PAGE_LABEL;
use frontier_core::links::EdgeWeight;
use frontier_core::{Backend, CrawlRequest, CrawlResponse, DiscoveredLink, FrontierConfigBuilder, PageId};

#[derive(Parser, Debug)]
#[command(
    name = "frontier-tool",
    version,
    about = "Inspect and drive an OPIC-HITS crawl frontier working directory",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create (or open) a working directory and immediately close it.
    Init {
        #[arg(long)]
        workdir: PathBuf,
    },
    /// Seed a page by its fingerprint and URL.
    Seed {
        #[arg(long)]
        workdir: PathBuf,
        #[arg(long)]
        fingerprint: String,
        #[arg(long)]
        url: String,
    },
    /// Record a crawl outcome, optionally discovering links.
    Crawled {
        #[arg(long)]
        workdir: PathBuf,
        #[arg(long)]
        fingerprint: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        domain: String,
        /// Path to a file with the fetched body (used for the change digest).
        #[arg(long)]
        body: PathBuf,
        /// Repeatable `fingerprint:url:domain` triples for discovered links.
        #[arg(long = "link", value_name = "FINGERPRINT:URL:DOMAIN")]
        links: Vec<String>,
    },
    /// Print the next pending requests.
    Next {
        #[arg(long)]
        workdir: PathBuf,
        #[arg(long, default_value_t = 10)]
        max: usize,
    },
    /// Print the relative hub/authority scores for a page, or pass
    /// `--fingerprint ⊥` to inspect the virtual page's current raw cash.
    Scores {
        #[arg(long)]
        workdir: PathBuf,
        #[arg(long)]
        fingerprint: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Init { workdir } => {
            let mut backend = open_backend(workdir)?;
            backend.stop()
        }
        Cmd::Seed {
            workdir,
            fingerprint,
            url,
        } => {
            let mut backend = open_backend(workdir)?;
            backend.add_seeds(&[CrawlRequest {
                page_id: page_id_of(&fingerprint)?,
                url,
            }]);
            backend.stop()
        }
        Cmd::Crawled {
            workdir,
            fingerprint,
            url,
            domain,
            body,
            links,
        } => {
            let mut backend = open_backend(workdir)?;
            let body_bytes =
                fs::read(&body).with_context(|| format!("read body file {}", body.display()))?;
            let mut parsed_links = Vec::with_capacity(links.len());
            for link in &links {
                parsed_links.push(parse_link(link)?);
            }
            backend.page_crawled(
                &CrawlResponse {
                    page_id: page_id_of(&fingerprint)?,
                    url,
                    domain,
                    body: body_bytes,
                },
                &parsed_links,
            );
            backend.stop()
        }
        Cmd::Next { workdir, max } => {
            let mut backend = open_backend(workdir)?;
            for req in backend.get_next_requests(max) {
                println!("{}\t{}", req.page_id, req.url);
            }
            backend.stop()
        }
        Cmd::Scores {
            workdir,
            fingerprint,
        } => {
            let backend = open_backend(workdir)?;
            if fingerprint == VIRTUAL_PAGE_LABEL {
                let (h, a) = backend.virtual_cash();
                println!("{VIRTUAL_PAGE_LABEL} h_cash={h:.6} a_cash={a:.6}");
            } else {
                let (h, a) = backend.get_scores(&page_id_of(&fingerprint)?);
                println!("hub={h:.6} authority={a:.6}");
            }
            Ok(())
        }
    }
}

fn open_backend(workdir: PathBuf) -> Result<Backend> {
    let cfg = FrontierConfigBuilder::from_default().workdir(workdir).build();
    Backend::start(cfg)
}

fn page_id_of(fingerprint: &str) -> Result<PageId> {
    PageId::new(fingerprint.as_bytes().to_vec())
}

fn parse_link(spec: &str) -> Result<DiscoveredLink> {
    let mut parts = spec.splitn(3, ':');
    let fingerprint = parts
        .next()
        .with_context(|| format!("malformed --link {spec}"))?;
    let url = parts
        .next()
        .with_context(|| format!("malformed --link {spec}"))?;
    let domain = parts
        .next()
        .with_context(|| format!("malformed --link {spec}"))?;
    Ok(DiscoveredLink {
        page_id: page_id_of(fingerprint)?,
        url: url.to_string(),
        domain: domain.to_string(),
        weight: EdgeWeight { w1: 1.0, w2: 1.0 },
    })
}
