//! Job records, their results, and the shared registry.
//!
//! A [`Job`] only changes through [`Job::start`], [`Job::complete`], and
//! [`Job::fail`], each of which checks the transition and updates status,
//! timestamps, and payload together. The [`JobRegistry`] applies those
//! transitions under a write lock and hands out whole-record clones, so a
//! reader never sees a terminal status without its result or error.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use sitedigest_shared::{
    DiscoveredLink, ExtractedFacts, JobId, JobKind, JobStatus, MarkdownDocument, Result,
    SiteDigestError,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One entry of a crawl job's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub link: DiscoveredLink,
    pub fetch_succeeded: bool,
    pub markdown: Option<MarkdownDocument>,
    pub facts: Option<ExtractedFacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Result of a crawl job: per-page entries plus the consolidated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub seed_url: String,
    /// Seed first, then sub-pages in discovery order.
    pub pages: Vec<PageReport>,
    /// All successfully fetched pages as one Markdown document.
    pub full_report: String,
}

/// What a completed job produced, by job kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutput {
    Single {
        document: MarkdownDocument,
        facts: ExtractedFacts,
    },
    Crawl(CrawlReport),
}

/// Per-page content exposed for crawl jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageContent {
    pub link: DiscoveredLink,
    pub fetch_succeeded: bool,
    pub markdown: Option<String>,
    pub facts: Option<ExtractedFacts>,
}

/// Content view of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobContent {
    Single {
        markdown: String,
        metadata: ExtractedFacts,
    },
    Crawl(Vec<PageContent>),
}

impl From<&JobOutput> for JobContent {
    fn from(output: &JobOutput) -> Self {
        match output {
            JobOutput::Single { document, facts } => Self::Single {
                markdown: document.content.clone(),
                metadata: facts.clone(),
            },
            JobOutput::Crawl(report) => Self::Crawl(
                report
                    .pages
                    .iter()
                    .map(|p| PageContent {
                        link: p.link.clone(),
                        fetch_succeeded: p.fetch_succeeded,
                        markdown: p.markdown.as_ref().map(|d| d.content.clone()),
                        facts: p.facts.clone(),
                    })
                    .collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A unit of background work and its lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    id: JobId,
    kind: JobKind,
    url: String,
    status: JobStatus,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JobOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Job {
    /// A fresh `PENDING` job.
    pub fn new(kind: JobKind, url: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            kind,
            url: url.into(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Set exactly when the status is terminal.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Set only when `COMPLETED`.
    pub fn result(&self) -> Option<&JobOutput> {
        self.result.as_ref()
    }

    /// Set only when `FAILED`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `PENDING -> PROCESSING`.
    pub fn start(&mut self) -> Result<()> {
        self.advance(JobStatus::Processing)
    }

    /// `PROCESSING -> COMPLETED` with the job's output.
    pub fn complete(&mut self, output: JobOutput) -> Result<()> {
        self.advance(JobStatus::Completed)?;
        self.result = Some(output);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `PROCESSING -> FAILED` with a human-readable message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.advance(JobStatus::Failed)?;
        self.error = Some(message.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// The content view, available only once the job has completed.
    pub fn content(&self) -> Result<JobContent> {
        match (&self.status, &self.result) {
            (JobStatus::Completed, Some(output)) => Ok(JobContent::from(output)),
            _ => Err(SiteDigestError::JobNotReady {
                id: self.id,
                status: self.status,
            }),
        }
    }

    fn advance(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_advance_to(next) {
            return Err(SiteDigestError::validation(format!(
                "job {}: illegal transition {} -> {next}",
                self.id, self.status
            )));
        }
        self.status = next;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Thread-safe map of every job submitted to an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id(), job);
    }

    pub async fn remove(&self, id: JobId) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    /// A snapshot of the job.
    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Number of jobs held, in any status.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Apply one transition atomically and return the resulting status.
    pub async fn update<F>(&self, id: JobId, transition: F) -> Result<JobStatus>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(SiteDigestError::JobNotFound(id))?;
        transition(job)?;
        Ok(job.status())
    }
}
