//! Visible-text extraction.

use scraper::Html;

/// Elements whose text content is never rendered.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Collect the human-visible text of a document.
///
/// Text inside script, style, noscript, and template elements is dropped.
/// Text nodes are concatenated as they appear in the markup, so a number
/// split across inline elements stays contiguous. Whitespace runs then
/// collapse to a single space and the result is trimmed.
pub fn visible_text(doc: &Html) -> String {
    let mut raw = String::new();

    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        raw.push_str(text);
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_across_elements() {
        let doc = Html::parse_document(
            "<html><body><h1>  Hello </h1>\n\n<p>big\t\tworld</p></body></html>",
        );
        assert_eq!(visible_text(&doc), "Hello big world");
    }

    #[test]
    fn skips_script_and_style() {
        let doc = Html::parse_document(
            "<html><head><style>body{color:red}</style></head>\
             <body><script>var x = 1;</script><noscript>enable js</noscript><p>kept</p></body></html>",
        );
        assert_eq!(visible_text(&doc), "kept");
    }

    #[test]
    fn inline_elements_do_not_add_separators() {
        let doc = Html::parse_document(
            "<html><body><p>CNPJ: <strong>11.222.333</strong>/0001-81</p><p>Cart<em>ão</em></p></body></html>",
        );
        assert_eq!(visible_text(&doc), "CNPJ: 11.222.333/0001-81Cartão");
    }

    #[test]
    fn empty_document_has_no_text() {
        let doc = Html::parse_document("");
        assert_eq!(visible_text(&doc), "");
    }
}
