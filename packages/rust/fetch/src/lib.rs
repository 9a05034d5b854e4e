//! Two-tier page acquisition.
//!
//! A [`FetchChain`] holds an ordered list of [`FetchStrategy`] tiers. Each tier
//! either returns HTML or an error; the first success wins and later tiers are
//! never consulted. A failed tier is never retried.
//!
//! The default chain is [`LightweightFetcher`] (plain GET plus a content-density
//! check) followed by [`RenderedFetcher`] (headless Chromium).

mod charset;
mod lightweight;
mod rendered;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use sitedigest_shared::{FetchConfig, FetchOutcome, FetchStrategyKind, Result};

pub use charset::decode_html;
pub use lightweight::{LightweightFetcher, ThinContent, assess_content};
pub use rendered::RenderedFetcher;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One tier of the fetch chain.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Which tier this is, recorded on the outcome.
    fn kind(&self) -> FetchStrategyKind;

    /// Acquire sufficient HTML for `url`, or explain why this tier could not.
    async fn fetch(&self, url: &Url) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Ordered fetch tiers; the first tier to succeed produces the page.
#[derive(Clone)]
pub struct FetchChain {
    strategies: Vec<Arc<dyn FetchStrategy>>,
}

impl FetchChain {
    /// Build a chain from explicit tiers, tried in the given order.
    pub fn new(strategies: Vec<Arc<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard lightweight → rendered chain.
    ///
    /// The rendered tier is omitted when `render_enabled` is false.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let mut strategies: Vec<Arc<dyn FetchStrategy>> =
            vec![Arc::new(LightweightFetcher::new(config)?)];

        if config.render_enabled {
            strategies.push(Arc::new(RenderedFetcher::new(config)));
        }

        Ok(Self::new(strategies))
    }

    /// Number of configured tiers.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True when no tier is configured; such a chain fails every fetch.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Fetch `url`, escalating through the tiers until one succeeds.
    ///
    /// Never returns an error: exhaustion is reported as a failed outcome
    /// carrying every tier's reason.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        if self.is_empty() {
            return FetchOutcome::failure(
                url.as_str(),
                FetchStrategyKind::Lightweight,
                "no fetch strategies configured",
            );
        }

        let mut failures: Vec<String> = Vec::new();
        let mut last_kind = FetchStrategyKind::Lightweight;

        for strategy in &self.strategies {
            last_kind = strategy.kind();
            debug!(strategy = %last_kind, "trying fetch tier");

            match strategy.fetch(url).await {
                Ok(html) => {
                    info!(strategy = %last_kind, bytes = html.len(), "page fetched");
                    return FetchOutcome::success(url.as_str(), html, last_kind);
                }
                Err(e) => {
                    warn!(strategy = %last_kind, error = %e, "fetch tier failed");
                    failures.push(format!("{last_kind}: {e}"));
                }
            }
        }

        FetchOutcome::failure(url.as_str(), last_kind, failures.join("; "))
    }
}

impl std::fmt::Debug for FetchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<FetchStrategyKind> = self.strategies.iter().map(|s| s.kind()).collect();
        f.debug_struct("FetchChain").field("strategies", &kinds).finish()
    }
}
