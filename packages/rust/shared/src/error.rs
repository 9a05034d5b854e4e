//! Error types for SiteDigest.
//!
//! Library crates use [`SiteDigestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::{JobId, JobStatus};

/// Top-level error type for all SiteDigest operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteDigestError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A single fetch tier failed (transport error, non-2xx status, or thin content).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Headless browser launch, navigation, or capture failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// Every fetch tier was exhausted for a page.
    #[error("page unreachable: {url}: {reason}")]
    PageUnreachable { url: String, reason: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The downstream ingestion process failed.
    ///
    /// `code` is `None` when the process could not be spawned, was killed by a
    /// signal, or exceeded its timeout.
    #[error("ingestion failed (exit code {}): {}", display_code(.code), collaborator_detail(.stdout, .stderr))]
    Collaborator {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// No job is registered under the given id.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The job exists but has not completed successfully.
    #[error("job {id} is not completed (status: {status})")]
    JobNotReady { id: JobId, status: JobStatus },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, illegal state transition, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteDigestError>;

impl SiteDigestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Prefer stderr, fall back to stdout, as the human-readable failure detail.
fn collaborator_detail(stdout: &str, stderr: &str) -> String {
    if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    }
}
