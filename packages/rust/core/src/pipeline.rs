//! Single-page and crawl pipelines behind the job orchestrator.

use async_trait::async_trait;
use scraper::Html;
use tracing::{info, instrument};
use url::Url;

use sitedigest_crawler::{CrawledPage, Crawler, SEED_LINK_TEXT};
use sitedigest_extract::extract;
use sitedigest_fetch::FetchChain;
use sitedigest_markdown::to_markdown;
use sitedigest_shared::{
    AppConfig, CrawlConfig, DiscoveredLink, FetchConfig, JobKind, MarkdownDocument, Result,
    SiteDigestError,
};

use crate::jobs::{CrawlReport, JobOutput, PageReport};
use crate::manager::JobRunner;

const REPORT_RULE_WIDTH: usize = 40;

/// Fetch → normalize → extract, for one page or a whole one-hop crawl.
#[derive(Debug, Clone)]
pub struct Pipeline {
    crawler: Crawler,
}

impl Pipeline {
    pub fn new(crawler: Crawler) -> Self {
        Self { crawler }
    }

    /// Build the fetch chain and crawler from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher = FetchChain::from_config(&FetchConfig::from(config))?;
        Ok(Self::new(Crawler::new(fetcher, CrawlConfig::from(config))))
    }

    /// Markdown and facts for one page.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn single(&self, url: &Url) -> Result<JobOutput> {
        let outcome = self.crawler.fetcher().fetch(url).await;
        let Some(html) = outcome.html.filter(|_| outcome.succeeded) else {
            return Err(SiteDigestError::PageUnreachable {
                url: url.to_string(),
                reason: outcome
                    .failure_reason
                    .unwrap_or_else(|| "no HTML returned".into()),
            });
        };

        let content = to_markdown(&html);
        let facts = extract(&Html::parse_document(&html));
        info!(
            strategy = %outcome.strategy_used,
            md_len = content.len(),
            "single page processed"
        );

        Ok(JobOutput::Single {
            document: MarkdownDocument {
                source_link: DiscoveredLink::new(SEED_LINK_TEXT, url.as_str()),
                content,
            },
            facts,
        })
    }

    /// Crawl `seed`, normalize every fetched page, and assemble the full report.
    #[instrument(skip_all, fields(seed = %seed))]
    pub async fn crawl(&self, seed: &Url) -> Result<JobOutput> {
        let result = self.crawler.crawl(seed).await;
        if let Some(reason) = result.seed_failure {
            return Err(SiteDigestError::PageUnreachable {
                url: seed.to_string(),
                reason,
            });
        }

        let pages: Vec<PageReport> = result.pages.into_iter().map(page_report).collect();
        let full_report = full_report(&pages);

        Ok(JobOutput::Crawl(CrawlReport {
            seed_url: result.seed_url,
            pages,
            full_report,
        }))
    }
}

#[async_trait]
impl JobRunner for Pipeline {
    async fn run(&self, kind: JobKind, url: &str) -> Result<JobOutput> {
        let url = Url::parse(url)
            .map_err(|e| SiteDigestError::validation(format!("invalid URL '{url}': {e}")))?;
        match kind {
            JobKind::Single => self.single(&url).await,
            JobKind::Crawl => self.crawl(&url).await,
        }
    }
}

fn page_report(page: CrawledPage) -> PageReport {
    let markdown = page.html.as_deref().map(|html| MarkdownDocument {
        source_link: page.link.clone(),
        content: to_markdown(html),
    });

    PageReport {
        link: page.link,
        fetch_succeeded: page.fetch_succeeded,
        markdown,
        facts: page.facts,
        failure_reason: page.failure_reason,
    }
}

/// One block per successfully fetched page, in crawl order.
pub fn full_report(pages: &[PageReport]) -> String {
    let rule = "=".repeat(REPORT_RULE_WIDTH);
    pages
        .iter()
        .filter_map(|p| p.markdown.as_ref())
        .map(|doc| {
            format!(
                "\n{rule}\nTITLE: {}\nLINK: {}\n{rule}\n\n--- MAIN CONTENT ---\n\n{}\n\n",
                doc.source_link.text, doc.source_link.url, doc.content
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline() -> Pipeline {
        let mut config = AppConfig::default();
        config.fetch.timeout_secs = 2;
        config.fetch.min_html_bytes = 0;
        config.fetch.min_text_chars = 0;
        config.fetch.render_enabled = false;
        config.crawl.concurrency = 1;
        Pipeline::from_config(&config).unwrap()
    }

    async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    const HOME: &str = r#"<html><head><title>Loja</title>
        <meta name="description" content="Moda praia"></head><body>
        <header><a href="/sobre">Sobre nós</a><a href="/contato">Contato</a></header>
        <main><h1>Loja</h1><p>Aceitamos <a href="/pix">pix</a>.</p></main>
        <footer>CNPJ 11.222.333/0001-81</footer>
        </body></html>"#;

    #[tokio::test]
    async fn single_page_markdown_and_facts() {
        let server = MockServer::start().await;
        serve(&server, "/", 200, HOME).await;

        let url = format!("{}/", server.uri());
        let output = pipeline().run(JobKind::Single, &url).await.unwrap();

        let JobOutput::Single { document, facts } = output else {
            panic!("expected single output");
        };
        assert_eq!(document.source_link.text, SEED_LINK_TEXT);
        assert!(document.content.starts_with("# Loja"), "{}", document.content);
        assert!(document.content.contains("Aceitamos pix."));
        assert_eq!(facts.metadata["description"], "Moda praia");
        assert_eq!(facts.tax_ids, vec!["11222333000181"]);
        assert!(facts.payment_methods.contains("pix"));
    }

    #[tokio::test]
    async fn latin1_page_without_header_charset() {
        let server = MockServer::start().await;
        let page = "<html><head><meta charset=\"iso-8859-1\"></head><body><main>\
            <p>Aceitamos Cartão de Crédito e boleto.</p></main></body></html>";
        let bytes: Vec<u8> = page.chars().map(|c| c as u32 as u8).collect();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(bytes, "text/html"))
            .mount(&server)
            .await;

        let output = pipeline().run(JobKind::Single, &server.uri()).await.unwrap();
        let JobOutput::Single { document, facts } = output else {
            panic!("expected single output");
        };
        assert_eq!(document.content, "Aceitamos Cartão de Crédito e boleto.");
        assert!(facts.payment_methods.contains("cartão de crédito"));
        assert!(facts.payment_methods.contains("crédito"));
        assert!(facts.payment_methods.contains("boleto"));
    }

    #[tokio::test]
    async fn single_page_unreachable() {
        let server = MockServer::start().await;
        serve(&server, "/", 503, "down").await;

        let err = pipeline().run(JobKind::Single, &server.uri()).await.unwrap_err();
        match err {
            SiteDigestError::PageUnreachable { reason, .. } => assert!(reason.contains("503")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let err = pipeline().run(JobKind::Crawl, "not a url").await.unwrap_err();
        assert!(matches!(err, SiteDigestError::Validation { .. }));
    }

    #[tokio::test]
    async fn crawl_builds_full_report() {
        let server = MockServer::start().await;
        serve(&server, "/", 200, HOME).await;
        serve(
            &server,
            "/sobre",
            200,
            "<html><body><main><p>Desde 1998.</p></main></body></html>",
        )
        .await;
        serve(&server, "/contato", 404, "missing").await;

        let seed = format!("{}/", server.uri());
        let output = tokio::time::timeout(
            Duration::from_secs(10),
            pipeline().run(JobKind::Crawl, &seed),
        )
        .await
        .unwrap()
        .unwrap();

        let JobOutput::Crawl(report) = output else {
            panic!("expected crawl output");
        };
        let texts: Vec<&str> = report.pages.iter().map(|p| p.link.text.as_str()).collect();
        assert_eq!(texts, vec![SEED_LINK_TEXT, "Sobre nós", "Contato"]);

        let contato = &report.pages[2];
        assert!(!contato.fetch_succeeded);
        assert!(contato.markdown.is_none());

        let rule = "=".repeat(40);
        let expected_sobre = format!(
            "\n{rule}\nTITLE: Sobre nós\nLINK: {}/sobre\n{rule}\n\n--- MAIN CONTENT ---\n\nDesde 1998.\n\n",
            server.uri()
        );
        assert!(report.full_report.ends_with(&expected_sobre), "{}", report.full_report);
        assert_eq!(report.full_report.matches("--- MAIN CONTENT ---").count(), 2);
        assert!(!report.full_report.contains("TITLE: Contato"));
    }

    #[tokio::test]
    async fn crawl_with_unreachable_seed_fails() {
        let server = MockServer::start().await;
        serve(&server, "/", 500, "boom").await;

        let err = pipeline().run(JobKind::Crawl, &server.uri()).await.unwrap_err();
        assert!(matches!(err, SiteDigestError::PageUnreachable { .. }));
    }
}
