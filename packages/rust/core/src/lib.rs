//! Job orchestration and end-to-end pipelines for SiteDigest.
//!
//! This crate ties together fetching, crawling, Markdown conversion, and
//! fact extraction into background jobs, and persists or hands off their
//! results (artifacts on disk, the external ingestion process).

pub mod artifacts;
pub mod ingest;
pub mod jobs;
pub mod manager;
pub mod pipeline;

pub use artifacts::{account_id, artifact_stem, save_artifacts};
pub use ingest::{IngestCommand, IngestOutput};
pub use jobs::{CrawlReport, Job, JobContent, JobOutput, JobRegistry, PageContent, PageReport};
pub use manager::{JobManager, JobRunner};
pub use pipeline::{Pipeline, full_report};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use sitedigest_shared::{AppConfig, JobStatus, JobsConfig};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn orchestrated_single_page_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Loja</title></head><body><main><h1>Olá</h1></main></body></html>",
            ))
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.fetch.min_html_bytes = 0;
        config.fetch.min_text_chars = 0;
        config.fetch.render_enabled = false;
        let pipeline = Pipeline::from_config(&config).unwrap();
        let manager = JobManager::start(&JobsConfig::from(&config), Arc::new(pipeline));

        let id = manager.submit_single(&server.uri()).await.unwrap();
        let mut job = manager.get_job(id).await.unwrap();
        for _ in 0..200 {
            if job.status().is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            job = manager.get_job(id).await.unwrap();
        }

        assert_eq!(job.status(), JobStatus::Completed, "{:?}", job.error());
        match manager.get_job_content(id).await.unwrap() {
            JobContent::Single { markdown, metadata } => {
                assert_eq!(markdown, "# Olá");
                assert_eq!(metadata.metadata["title"], "Loja");
            }
            other => panic!("unexpected content: {other:?}"),
        }
        manager.shutdown().await;
    }
}
