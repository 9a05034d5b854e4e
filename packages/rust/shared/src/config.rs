//! Application configuration for SiteDigest.
//!
//! User config lives at `~/.sitedigest/sitedigest.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteDigestError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitedigest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitedigest";

/// Browser-identifying User-Agent sent by the lightweight tier.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching sitedigest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fetch tiers.
    #[serde(default)]
    pub fetch: FetchSection,

    /// Crawl link policy.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Worker pool.
    #[serde(default)]
    pub jobs: JobsSection,

    /// Where artifacts are written.
    #[serde(default)]
    pub output: OutputSection,

    /// Downstream ingestion process.
    #[serde(default)]
    pub ingest: IngestSection,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Lightweight request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum raw body length before escalating.
    #[serde(default = "default_min_html_bytes")]
    pub min_html_bytes: usize,

    /// Minimum visible-text length before escalating.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    /// Whether the headless-browser tier is available.
    #[serde(default = "default_true")]
    pub render_enabled: bool,

    /// Navigation cap for the rendered tier.
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    /// Fixed settle delay after navigation.
    #[serde(default = "default_render_settle_ms")]
    pub render_settle_ms: u64,

    /// Explicit Chrome/Chromium binary; auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_executable: Option<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            min_html_bytes: default_min_html_bytes(),
            min_text_chars: default_min_text_chars(),
            render_enabled: true,
            render_timeout_secs: default_render_timeout_secs(),
            render_settle_ms: default_render_settle_ms(),
            chrome_executable: None,
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_min_html_bytes() -> usize {
    500
}
fn default_min_text_chars() -> usize {
    200
}
fn default_true() -> bool {
    true
}
fn default_render_timeout_secs() -> u64 {
    30
}
fn default_render_settle_ms() -> u64 {
    2000
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Sub-page links accepted per crawl.
    #[serde(default = "default_max_links")]
    pub max_links: usize,

    /// Concurrent sub-page fetches within one crawl (1 = sequential).
    #[serde(default = "default_crawl_concurrency")]
    pub concurrency: usize,

    /// A link is kept only if its lowercased URL contains one of these.
    #[serde(default = "default_topic_terms")]
    pub topic_terms: Vec<String>,

    /// Links to these hosts (or their subdomains) are never followed.
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            max_links: default_max_links(),
            concurrency: default_crawl_concurrency(),
            topic_terms: default_topic_terms(),
            blocked_hosts: default_blocked_hosts(),
        }
    }
}

fn default_max_links() -> usize {
    20
}
fn default_crawl_concurrency() -> usize {
    1
}
fn default_topic_terms() -> Vec<String> {
    [
        "sobre", "pagamento", "garantia", "contato", "empresa", "troca", "about", "payment",
        "contact", "warranty",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_blocked_hosts() -> Vec<String> {
    [
        "facebook.com",
        "instagram.com",
        "whatsapp.com",
        "wa.me",
        "youtube.com",
        "youtu.be",
        "twitter.com",
        "x.com",
        "pinterest.com",
        "linkedin.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[jobs]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsSection {
    /// Fixed worker pool size.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for JobsSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    5
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "results".into()
}

/// `[ingest]` section: the external FAQ/embedding ingestion script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSection {
    /// Interpreter or executable to run.
    #[serde(default = "default_ingest_program")]
    pub program: String,

    /// Script passed as the first argument (omitted when empty).
    #[serde(default = "default_ingest_script")]
    pub script: String,

    /// Working directory for the process (inherits ours when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default = "default_ingest_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            program: default_ingest_program(),
            script: default_ingest_script(),
            working_dir: None,
            timeout_secs: default_ingest_timeout_secs(),
        }
    }
}

fn default_ingest_program() -> String {
    "python3".into()
}
fn default_ingest_script() -> String {
    "langchain/Agente_FAQ.py".into()
}
fn default_ingest_timeout_secs() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub min_html_bytes: usize,
    pub min_text_chars: usize,
    pub render_enabled: bool,
    pub render_timeout: Duration,
    pub render_settle: Duration,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        let f = &config.fetch;
        Self {
            user_agent: f.user_agent.clone(),
            timeout: Duration::from_secs(f.timeout_secs),
            min_html_bytes: f.min_html_bytes,
            min_text_chars: f.min_text_chars,
            render_enabled: f.render_enabled,
            render_timeout: Duration::from_secs(f.render_timeout_secs),
            render_settle: Duration::from_millis(f.render_settle_ms),
            chrome_executable: f.chrome_executable.as_ref().map(PathBuf::from),
        }
    }
}

/// Runtime crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_links: usize,
    pub concurrency: usize,
    /// Lowercased topical allowlist.
    pub topic_terms: Vec<String>,
    /// Lowercased host blocklist.
    pub blocked_hosts: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let c = &config.crawl;
        Self {
            max_links: c.max_links,
            concurrency: c.concurrency.max(1),
            topic_terms: c.topic_terms.iter().map(|t| t.to_lowercase()).collect(),
            blocked_hosts: c.blocked_hosts.iter().map(|h| h.to_lowercase()).collect(),
        }
    }
}

/// Runtime worker-pool configuration.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub workers: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for JobsConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            workers: config.jobs.workers.max(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitedigest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteDigestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitedigest/sitedigest.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteDigestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SiteDigestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteDigestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteDigestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteDigestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
