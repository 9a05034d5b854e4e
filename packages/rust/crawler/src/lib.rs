//! Seed-plus-one-hop crawl controller.
//!
//! This crate provides:
//! - [`discover_links`]: topical sub-link discovery from a seed page
//! - [`Crawler`]: fetches the seed and its accepted sub-links, extracting facts per page

pub mod engine;
pub mod links;

pub use engine::{CrawlResult, CrawledPage, Crawler, SEED_LINK_TEXT};
pub use links::{LinkRegion, discover_links, normalize_url};

#[cfg(test)]
mod tests {
    use super::*;
    use sitedigest_shared::CrawlConfig;
    use url::Url;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn store_fixture_links() {
        let html = load_fixture("store_home.html");
        let seed = Url::parse("https://loja.example/").unwrap();
        let links = discover_links(&html, &seed, &CrawlConfig::default());

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://loja.example/sobre-nos",
                "https://loja.example/formas-de-pagamento",
                "https://loja.example/politica-de-troca",
                "https://loja.example/contato",
            ]
        );
        assert_eq!(links[2].text, "Trocas e devoluções");
    }
}
