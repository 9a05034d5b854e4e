//! One-hop crawl controller.
//!
//! The crawler fetches the seed page, discovers its topical sub-links, then
//! fetches and extracts each of them. A sub-page that cannot be fetched is
//! recorded as failed and the crawl carries on; only an unreachable seed
//! aborts it.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use scraper::Html;
use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use sitedigest_extract::extract;
use sitedigest_fetch::FetchChain;
use sitedigest_shared::{CrawlConfig, DiscoveredLink, ExtractedFacts, FetchStrategyKind};

use crate::links::discover_links;

/// Anchor text recorded for the seed page.
pub const SEED_LINK_TEXT: &str = "Main page";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One page visited during a crawl.
#[derive(Debug, Clone, Serialize)]
pub struct CrawledPage {
    pub link: DiscoveredLink,
    pub fetch_succeeded: bool,
    /// Raw HTML, present only when the fetch succeeded.
    #[serde(skip)]
    pub html: Option<String>,
    pub facts: Option<ExtractedFacts>,
    /// Tier that produced the HTML, or the last tier tried.
    pub strategy: FetchStrategyKind,
    pub failure_reason: Option<String>,
}

/// Outcome of crawling one seed.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub seed_url: String,
    /// Seed first, then sub-pages in discovery order. Empty when the seed failed.
    pub pages: Vec<CrawledPage>,
    /// Why the seed could not be fetched.
    pub seed_failure: Option<String>,
}

impl CrawlResult {
    /// Whether the seed was fetched (and therefore the crawl ran).
    pub fn seed_reachable(&self) -> bool {
        self.seed_failure.is_none()
    }

    /// Number of pages whose fetch succeeded.
    pub fn succeeded(&self) -> usize {
        self.pages.iter().filter(|p| p.fetch_succeeded).count()
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Seed-plus-one-hop crawler over a [`FetchChain`].
#[derive(Debug, Clone)]
pub struct Crawler {
    fetcher: FetchChain,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(fetcher: FetchChain, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn fetcher(&self) -> &FetchChain {
        &self.fetcher
    }

    /// Crawl `seed` and at most `max_links` of its topical sub-pages.
    #[instrument(skip_all, fields(seed = %seed))]
    pub async fn crawl(&self, seed: &Url) -> CrawlResult {
        let start = Instant::now();
        let seed_link = DiscoveredLink::new(SEED_LINK_TEXT, seed.as_str());
        let seed_page = self.visit(seed_link).await;

        if !seed_page.fetch_succeeded {
            warn!(reason = ?seed_page.failure_reason, "seed unreachable, crawl aborted");
            return CrawlResult {
                seed_url: seed.to_string(),
                pages: Vec::new(),
                seed_failure: seed_page
                    .failure_reason
                    .or_else(|| Some("seed fetch failed".into())),
            };
        }

        let links = seed_page
            .html
            .as_deref()
            .map(|html| discover_links(html, seed, &self.config))
            .unwrap_or_default();

        info!(
            links = links.len(),
            concurrency = self.config.concurrency,
            "starting sub-page fetches"
        );

        // `buffered` keeps results in discovery order regardless of completion order.
        let sub_pages: Vec<CrawledPage> = stream::iter(links)
            .map(|link| self.visit(link))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut pages = Vec::with_capacity(sub_pages.len() + 1);
        pages.push(seed_page);
        pages.extend(sub_pages);

        let result = CrawlResult {
            seed_url: seed.to_string(),
            pages,
            seed_failure: None,
        };

        info!(
            pages_fetched = result.succeeded(),
            pages_failed = result.pages.len() - result.succeeded(),
            duration_ms = start.elapsed().as_millis() as u64,
            "crawl completed"
        );

        result
    }

    /// Fetch one link and extract its facts. Never fails.
    async fn visit(&self, link: DiscoveredLink) -> CrawledPage {
        let url = match Url::parse(&link.url) {
            Ok(url) => url,
            Err(e) => {
                return CrawledPage {
                    link,
                    fetch_succeeded: false,
                    html: None,
                    facts: None,
                    strategy: FetchStrategyKind::Lightweight,
                    failure_reason: Some(format!("invalid url: {e}")),
                };
            }
        };

        let outcome = self.fetcher.fetch(&url).await;
        let facts = outcome.html.as_deref().map(analyze);

        CrawledPage {
            link,
            fetch_succeeded: outcome.succeeded,
            html: outcome.html,
            facts,
            strategy: outcome.strategy_used,
            failure_reason: outcome.failure_reason,
        }
    }
}

fn analyze(html: &str) -> ExtractedFacts {
    let doc = Html::parse_document(html);
    extract(&doc)
}
