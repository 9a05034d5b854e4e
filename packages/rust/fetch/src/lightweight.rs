//! Plain HTTP tier with a content-density heuristic.
//!
//! Server-rendered pages carry their text in the initial response; script-rendered
//! shells do not. A response that is too short, or whose visible text is too
//! sparse, is treated as a failure so the chain escalates to the rendered tier.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::Html;
use tracing::debug;
use url::Url;

use sitedigest_extract::visible_text;
use sitedigest_shared::{FetchConfig, FetchStrategyKind, Result, SiteDigestError};

use crate::FetchStrategy;
use crate::charset::decode_html;

/// Why a 2xx response was judged insufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinContent {
    /// Raw body below the byte threshold.
    TooShort { bytes: usize },
    /// Visible text below the character threshold.
    SparseText { chars: usize },
}

impl std::fmt::Display for ThinContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { bytes } => write!(f, "response too short ({bytes} bytes)"),
            Self::SparseText { chars } => {
                write!(f, "too little visible text ({chars} chars), likely script-rendered")
            }
        }
    }
}

/// Check a response body against the size and text-density thresholds.
///
/// Returns `None` when the body is sufficient.
pub fn assess_content(html: &str, min_html_bytes: usize, min_text_chars: usize) -> Option<ThinContent> {
    if html.len() < min_html_bytes {
        return Some(ThinContent::TooShort { bytes: html.len() });
    }

    let doc = Html::parse_document(html);
    let chars = visible_text(&doc).chars().count();
    if chars < min_text_chars {
        return Some(ThinContent::SparseText { chars });
    }

    None
}

/// GET with a browser User-Agent, a hard timeout, and no retries.
pub struct LightweightFetcher {
    client: Client,
    min_html_bytes: usize,
    min_text_chars: usize,
}

impl LightweightFetcher {
    /// Create the fetcher and its HTTP client.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| SiteDigestError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            min_html_bytes: config.min_html_bytes,
            min_text_chars: config.min_text_chars,
        })
    }
}

#[async_trait]
impl FetchStrategy for LightweightFetcher {
    fn kind(&self) -> FetchStrategyKind {
        FetchStrategyKind::Lightweight
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| SiteDigestError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteDigestError::Fetch(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SiteDigestError::Fetch(format!("{url}: body read failed: {e}")))?;
        let body = decode_html(&bytes, content_type.as_deref());

        if let Some(thin) = assess_content(&body, self.min_html_bytes, self.min_text_chars) {
            return Err(SiteDigestError::Fetch(format!("{url}: {thin}")));
        }

        debug!(%url, bytes = body.len(), "lightweight fetch sufficient");
        Ok(body)
    }
}
