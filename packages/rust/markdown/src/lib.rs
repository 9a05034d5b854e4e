//! HTML-to-Markdown conversion and cleanup.
//!
//! [`to_markdown`] narrows the page to its main content container, unwraps
//! every anchor, converts the tree with `htmd` using ATX headings, and then
//! runs the [`cleanup`] passes. It never returns an error: a conversion
//! failure becomes a short inline marker in the output.

mod cleanup;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::LazyLock;

use htmd::HtmlToMarkdown;
use htmd::options::{HeadingStyle, Options};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use sitedigest_shared::{Result, SiteDigestError};

pub use cleanup::cleanup;

/// Deepest element nesting handed to the converter.
///
/// The converter recurses once per level; anything deeper is reported
/// instead of risking the worker's stack.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Content containers tried in order before falling back to `<body>`.
const CONTENT_SELECTORS: [&str; 2] = ["main", "[role=\"main\"]"];

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// Convert a raw HTML page to cleaned Markdown.
#[instrument(skip_all, fields(html_len = html.len()))]
pub fn to_markdown(html: &str) -> String {
    let markdown = match convert(html) {
        Ok(md) => md,
        Err(e) => {
            warn!(error = %e, "markdown conversion failed");
            format!("[{e}]")
        }
    };

    let cleaned = cleanup(&markdown);
    debug!(md_len = cleaned.len(), "markdown ready");
    cleaned
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn convert(html: &str) -> Result<String> {
    let content_html = extract_content_html(html)?;

    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            ..Default::default()
        })
        .skip_tags(vec!["script", "style", "noscript", "template", "iframe", "svg"])
        .build();

    match catch_unwind(AssertUnwindSafe(|| converter.convert(&content_html))) {
        Ok(Ok(md)) => Ok(md),
        Ok(Err(e)) => Err(SiteDigestError::Conversion(e.to_string())),
        Err(panic) => Err(SiteDigestError::Conversion(panic_message(&*panic))),
    }
}

/// Inner HTML of the main content container, or of `<body>` when there is none,
/// with every anchor replaced by its children.
fn extract_content_html(html: &str) -> Result<String> {
    let mut doc = Html::parse_document(html);
    unwrap_anchors(&mut doc);

    let container = CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| doc.select(&sel).next())
        .or_else(|| {
            Selector::parse("body")
                .ok()
                .and_then(|sel| doc.select(&sel).next())
        });

    let Some(container) = container else {
        return Ok(html.to_string());
    };

    let depth = nesting_depth(container);
    if depth > MAX_NESTING_DEPTH {
        return Err(SiteDigestError::Conversion(format!(
            "nesting depth {depth} exceeds limit of {MAX_NESTING_DEPTH}"
        )));
    }

    Ok(container.inner_html())
}

/// Depth of the deepest node below `root`, computed without recursion.
fn nesting_depth(root: ElementRef<'_>) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(*root, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        stack.extend(node.children().map(|child| (child, depth + 1)));
    }

    deepest
}

/// Replace every `<a>` element with its children, in place.
fn unwrap_anchors(doc: &mut Html) {
    let anchors: Vec<_> = doc.select(&ANCHOR_SEL).map(|a| a.id()).collect();

    for anchor in anchors {
        let children: Vec<_> = doc
            .tree
            .get(anchor)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default();

        let Some(mut node) = doc.tree.get_mut(anchor) else {
            continue;
        };
        for child in children {
            node.insert_id_before(child);
        }
        node.detach();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "converter panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
