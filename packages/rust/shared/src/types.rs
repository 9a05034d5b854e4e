//! Core domain types shared by the fetch, extract, crawl, and job crates.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Which fetch tier produced (or last attempted) a page's HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStrategyKind {
    /// Plain HTTP GET.
    Lightweight,
    /// Headless browser rendering.
    Rendered,
}

impl std::fmt::Display for FetchStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lightweight => f.write_str("lightweight"),
            Self::Rendered => f.write_str("rendered"),
        }
    }
}

/// Result of acquiring HTML for one URL. Produced fresh per fetch call.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The URL that was requested.
    pub url: String,
    /// Whether any tier produced usable HTML.
    pub succeeded: bool,
    /// The HTML from the winning tier.
    pub html: Option<String>,
    /// The winning tier, or the last tier attempted on failure.
    pub strategy_used: FetchStrategyKind,
    /// Accumulated per-tier failure reasons when every tier failed.
    pub failure_reason: Option<String>,
}

impl FetchOutcome {
    /// A successful fetch.
    pub fn success(url: impl Into<String>, html: String, strategy: FetchStrategyKind) -> Self {
        Self {
            url: url.into(),
            succeeded: true,
            html: Some(html),
            strategy_used: strategy,
            failure_reason: None,
        }
    }

    /// A fetch where every tier failed.
    pub fn failure(
        url: impl Into<String>,
        strategy: FetchStrategyKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            succeeded: false,
            html: None,
            strategy_used: strategy,
            failure_reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Links and documents
// ---------------------------------------------------------------------------

/// An anchor discovered on a page, resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    /// Trimmed anchor text.
    pub text: String,
    /// Absolute URL.
    pub url: String,
}

impl DiscoveredLink {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// Cleaned Markdown for one successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownDocument {
    /// The link the page was reached through.
    pub source_link: DiscoveredLink,
    /// Normalized Markdown body.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Extracted facts
// ---------------------------------------------------------------------------

/// Social platforms recognised by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Facebook,
    Linkedin,
    Twitter,
    Youtube,
}

impl SocialPlatform {
    /// All platforms, in reporting order.
    pub const ALL: [SocialPlatform; 5] = [
        Self::Instagram,
        Self::Facebook,
        Self::Linkedin,
        Self::Twitter,
        Self::Youtube,
    ];
}

/// Structured facts derived from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFacts {
    /// Title and selected meta tags; only present keys are included.
    pub metadata: BTreeMap<String, String>,
    /// Profile URLs per platform; platforms without matches are omitted.
    pub social_profiles: BTreeMap<SocialPlatform, Vec<String>>,
    /// Check-digit-validated 14-digit tax identifiers, in page order.
    /// Repeated occurrences are kept.
    pub tax_ids: Vec<String>,
    /// Lowercase payment keywords found in text or image alt attributes.
    pub payment_methods: BTreeSet<String>,
}

impl ExtractedFacts {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
            && self.social_profiles.is_empty()
            && self.tax_ids.is_empty()
            && self.payment_methods.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for job identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status of a job.
///
/// Ordered `Pending < Processing < {Completed, Failed}`; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the lifecycle; both terminal states share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether this is `Completed` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a legal single-step transition.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Which pipeline a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Fetch, normalize, and extract one page.
    Single,
    /// Crawl the seed page and its topical sub-pages.
    Crawl,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Crawl => f.write_str("crawl"),
        }
    }
}
