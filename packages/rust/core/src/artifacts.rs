//! Naming and persistence of job artifacts on disk.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use sitedigest_shared::{DiscoveredLink, ExtractedFacts, JobStatus, Result, SiteDigestError};

use crate::jobs::{Job, JobOutput};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Short filesystem-safe name for a page: first host label plus its path.
///
/// `https://www.loja.example/sobre/nos/` becomes `loja_sobre_nos`.
pub fn artifact_stem(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return sanitize(url).unwrap_or_else(|| "page".into());
    };

    let host = parsed.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next().unwrap_or_default();

    let path = parsed.path().trim_matches('/').replace('/', "_");
    let raw = if path.is_empty() {
        label.to_string()
    } else {
        format!("{label}_{path}")
    };

    sanitize(&raw).unwrap_or_else(|| "page".into())
}

/// Identifier for a site's ingestion partition: `www.loja-exemplo.com.br` becomes `loja_exemplo_com_br`.
pub fn account_id(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host.is_empty() {
        return "site".into();
    }
    host.replace(['.', '-'], "_")
}

fn sanitize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PageFacts<'a> {
    link: &'a DiscoveredLink,
    fetch_succeeded: bool,
    facts: Option<&'a ExtractedFacts>,
}

/// Write a completed job's Markdown and facts under `dir`.
///
/// Single jobs produce `<base>.md`, crawl jobs `<base>_full_report.md`; both
/// also produce `<base>_facts.json`. Returns the written paths.
#[instrument(skip_all, fields(job_id = %job.id(), dir = %dir.display()))]
pub fn save_artifacts(dir: &Path, job: &Job) -> Result<Vec<PathBuf>> {
    let output = match (job.status(), job.result()) {
        (JobStatus::Completed, Some(output)) => output,
        _ => {
            return Err(SiteDigestError::JobNotReady {
                id: job.id(),
                status: job.status(),
            });
        }
    };

    std::fs::create_dir_all(dir).map_err(|e| SiteDigestError::io(dir, e))?;

    let base = format!(
        "{}_{}",
        artifact_stem(job.url()),
        job.created_at().format(TIMESTAMP_FORMAT)
    );

    let written = match output {
        JobOutput::Single { document, facts } => {
            let md_path = dir.join(format!("{base}.md"));
            write_text(&md_path, &document.content)?;
            let facts_path = dir.join(format!("{base}_facts.json"));
            write_json(&facts_path, facts)?;
            vec![md_path, facts_path]
        }
        JobOutput::Crawl(report) => {
            let md_path = dir.join(format!("{base}_full_report.md"));
            write_text(&md_path, &report.full_report)?;

            let facts: Vec<PageFacts<'_>> = report
                .pages
                .iter()
                .map(|p| PageFacts {
                    link: &p.link,
                    fetch_succeeded: p.fetch_succeeded,
                    facts: p.facts.as_ref(),
                })
                .collect();
            let facts_path = dir.join(format!("{base}_facts.json"));
            write_json(&facts_path, &facts)?;
            vec![md_path, facts_path]
        }
    };

    info!(files = written.len(), "artifacts saved");
    Ok(written)
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| SiteDigestError::io(path, e))?;
    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| SiteDigestError::validation(format!("JSON serialization failed: {e}")))?;
    write_text(path, &json)
}
