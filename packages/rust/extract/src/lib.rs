//! Structured fact extraction from parsed HTML.
//!
//! [`extract`] derives page metadata, social profile links, check-digit
//! validated tax identifiers, and payment method keywords. It never fails:
//! a fact that is absent from the page is simply absent from the result.

mod social;
mod tax_id;
mod text;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use sitedigest_shared::ExtractedFacts;

pub use social::classify_profile;
pub use tax_id::{check_digits, is_valid_tax_id};
pub use text::visible_text;

/// Payment keywords matched as lowercase substrings.
pub const PAYMENT_KEYWORDS: [&str; 13] = [
    "pix",
    "boleto",
    "cartão de crédito",
    "cartão de débito",
    "visa",
    "mastercard",
    "elo",
    "american express",
    "paypal",
    "mercado pago",
    "pagseguro",
    "crédito",
    "débito",
];

/// Meta tags copied into the metadata map: (attribute, value, output key).
const META_TAGS: [(&str, &str, &str); 4] = [
    ("name", "description", "description"),
    ("name", "keywords", "keywords"),
    ("property", "og:title", "og:title"),
    ("property", "og:description", "og:description"),
];

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static META_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid selector"));
static IMG_ALT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[alt]").expect("valid selector"));

/// Derive every supported fact from `doc`.
pub fn extract(doc: &Html) -> ExtractedFacts {
    let text = visible_text(doc);

    let facts = ExtractedFacts {
        metadata: metadata(doc),
        social_profiles: social::social_profiles(doc),
        tax_ids: tax_id::find_tax_ids(&text),
        payment_methods: payment_methods(doc, &text),
    };

    debug!(
        metadata = facts.metadata.len(),
        social = facts.social_profiles.len(),
        tax_ids = facts.tax_ids.len(),
        payments = facts.payment_methods.len(),
        "facts extracted"
    );

    facts
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

fn metadata(doc: &Html) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();

    if let Some(title) = doc.select(&TITLE_SEL).next() {
        let title = title.text().collect::<String>().trim().to_string();
        if !title.is_empty() {
            out.insert("title".to_string(), title);
        }
    }

    for meta in doc.select(&META_SEL) {
        let el = meta.value();
        let Some(content) = el.attr("content").filter(|c| !c.trim().is_empty()) else {
            continue;
        };

        for (attr, value, key) in META_TAGS {
            if el.attr(attr) == Some(value) && !out.contains_key(key) {
                out.insert(key.to_string(), content.trim().to_string());
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Payment methods
// ---------------------------------------------------------------------------

fn payment_methods(doc: &Html, text: &str) -> BTreeSet<String> {
    let mut haystacks = vec![text.to_lowercase()];
    haystacks.extend(
        doc.select(&IMG_ALT_SEL)
            .filter_map(|img| img.value().attr("alt"))
            .map(str::to_lowercase),
    );

    PAYMENT_KEYWORDS
        .into_iter()
        .filter(|kw| haystacks.iter().any(|h| h.contains(*kw)))
        .map(String::from)
        .collect()
}
