//! Sub-link discovery for one-hop crawls.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use sitedigest_shared::{CrawlConfig, DiscoveredLink};

static HEADER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("header").expect("valid selector"));
static FOOTER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("footer").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Where candidate anchors were gathered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRegion {
    Header,
    Footer,
    WholePage,
}

/// Collect the topical sub-links of `seed`'s page.
///
/// Anchors come from the first `<header>`; if it has none, from the first
/// `<footer>`; if neither has any, from the whole page. Filtering happens
/// after the region is chosen, so a header full of off-topic links still wins.
pub fn discover_links(html: &str, seed: &Url, config: &CrawlConfig) -> Vec<DiscoveredLink> {
    let doc = Html::parse_document(html);
    let (region, anchors) = candidate_anchors(&doc);
    debug!(?region, candidates = anchors.len(), "gathered candidate anchors");

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(normalize_url(seed.as_str()));

    let mut links = Vec::new();
    for anchor in anchors {
        if links.len() >= config.max_links {
            break;
        }

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.contains('#') {
            debug!(href, "rejected: fragment");
            continue;
        }

        let Ok(resolved) = seed.join(href.trim()) else {
            debug!(href, "rejected: unresolvable");
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            debug!(url = %resolved, "rejected: scheme");
            continue;
        }
        if is_blocked_host(&resolved, &config.blocked_hosts) {
            debug!(url = %resolved, "rejected: blocked host");
            continue;
        }

        let lowered = resolved.as_str().to_lowercase();
        if !config.topic_terms.iter().any(|t| lowered.contains(t.as_str())) {
            debug!(url = %resolved, "rejected: off-topic");
            continue;
        }

        if !seen.insert(normalize_url(resolved.as_str())) {
            debug!(url = %resolved, "rejected: already seen");
            continue;
        }

        let text = anchor.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
        debug!(url = %resolved, text = %text, "accepted link");
        links.push(DiscoveredLink::new(text, resolved.as_str()));
    }

    links
}

/// Anchors from the preferred region, plus which region supplied them.
fn candidate_anchors(doc: &Html) -> (LinkRegion, Vec<ElementRef<'_>>) {
    let regions = [(LinkRegion::Header, &*HEADER_SEL), (LinkRegion::Footer, &*FOOTER_SEL)];

    for (region, selector) in regions {
        if let Some(el) = doc.select(selector).next() {
            let anchors: Vec<ElementRef<'_>> = el.select(&LINK_SEL).collect();
            if !anchors.is_empty() {
                return (region, anchors);
            }
        }
    }

    (LinkRegion::WholePage, doc.select(&LINK_SEL).collect())
}

/// Whether the URL's host is a blocked domain or one of its subdomains.
fn is_blocked_host(url: &Url, blocked: &[String]) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    let host = host.to_lowercase();

    blocked.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Dedup key for a URL: trailing slash removed.
pub fn normalize_url(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Url {
        Url::parse("https://loja.example/").unwrap()
    }

    fn urls(links: &[DiscoveredLink]) -> Vec<&str> {
        links.iter().map(|l| l.url.as_str()).collect()
    }

    #[test]
    fn header_links_filtered_and_resolved() {
        let html = r##"<html><body>
            <header>
              <a href="/sobre-nos"> Sobre
                 nós </a>
              <a href="/contato#form">Contato (âncora)</a>
              <a href="mailto:contato@loja.example">E-mail</a>
              <a href="https://www.facebook.com/lojaexemplo/about">Facebook</a>
              <a href="https://wa.me/551199999?text=contato">WhatsApp</a>
              <a href="/colecao/verao">Verão</a>
              <a href="https://loja.example/Formas-De-Pagamento">Pagamento</a>
              <a href="/sobre-nos/">Sobre (de novo)</a>
            </header>
            <footer><a href="/garantia">Garantia</a></footer>
        </body></html>"##;

        let links = discover_links(html, &seed(), &CrawlConfig::default());

        assert_eq!(
            urls(&links),
            vec![
                "https://loja.example/sobre-nos",
                "https://loja.example/Formas-De-Pagamento",
            ]
        );
        assert_eq!(links[0].text, "Sobre nós");
    }

    #[test]
    fn footer_used_when_header_has_no_anchors() {
        let html = r#"<html><body>
            <header><h1>Loja</h1></header>
            <a href="/empresa">Empresa</a>
            <footer><a href="/politica-de-troca">Trocas</a></footer>
        </body></html>"#;

        let links = discover_links(html, &seed(), &CrawlConfig::default());
        assert_eq!(urls(&links), vec!["https://loja.example/politica-de-troca"]);
    }

    #[test]
    fn whole_page_used_without_regions() {
        let html = r#"<html><body><div><a href="/contato">Contato</a></div></body></html>"#;
        let links = discover_links(html, &seed(), &CrawlConfig::default());
        assert_eq!(urls(&links), vec!["https://loja.example/contato"]);
    }

    #[test]
    fn off_topic_header_does_not_fall_back() {
        let html = r#"<html><body>
            <header><a href="/carrinho">Carrinho</a></header>
            <footer><a href="/contato">Contato</a></footer>
        </body></html>"#;

        assert!(discover_links(html, &seed(), &CrawlConfig::default()).is_empty());
    }

    #[test]
    fn seed_is_never_rediscovered() {
        let seed = Url::parse("https://loja.example/sobre").unwrap();
        let html = r#"<html><body><a href="/sobre/">Sobre</a><a href="/sobre">Sobre</a></body></html>"#;
        assert!(discover_links(html, &seed, &CrawlConfig::default()).is_empty());
    }

    #[test]
    fn accepted_links_are_capped() {
        let anchors: String = (0..500)
            .map(|i| format!(r#"<a href="/contato-{i}">Contato {i}</a>"#))
            .collect();
        let html = format!("<html><body><header>{anchors}</header></body></html>");

        let links = discover_links(&html, &seed(), &CrawlConfig::default());
        assert_eq!(links.len(), 20);
        assert_eq!(links[19].url, "https://loja.example/contato-19");
    }

    #[test]
    fn blocked_host_matches_subdomains_only() {
        let blocked = vec!["x.com".to_string()];
        assert!(is_blocked_host(&Url::parse("https://x.com/a").unwrap(), &blocked));
        assert!(is_blocked_host(&Url::parse("https://mobile.x.com/a").unwrap(), &blocked));
        assert!(!is_blocked_host(&Url::parse("https://box.com/a").unwrap(), &blocked));
    }

    #[test]
    fn normalize_strips_trailing_slash() {
        assert_eq!(normalize_url("https://a.example/sobre/"), "https://a.example/sobre");
        assert_eq!(normalize_url("https://a.example/sobre"), "https://a.example/sobre");
    }
}
