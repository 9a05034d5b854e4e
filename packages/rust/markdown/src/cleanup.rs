//! Text-level cleanup applied to converted Markdown.
//!
//! Each pass is a function `&str -> String` applied in sequence. Image and
//! link removal repeat until nothing changes, so one removal can never
//! expose another match to a later run; `cleanup` is idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Run every cleanup pass over `md`.
pub fn cleanup(md: &str) -> String {
    let mut result = md.to_string();

    loop {
        let next = collapse_links(&strip_images(&result));
        if next == result {
            break;
        }
        result = next;
    }

    result = collapse_blank_lines(&result);
    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Strip images
// ---------------------------------------------------------------------------

/// Remove `![alt](src)` references entirely, including multi-line data URIs.
fn strip_images(md: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)!\[.*?\]\(.*?\)").expect("valid regex"));

    IMAGE_RE.replace_all(md, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Collapse links
// ---------------------------------------------------------------------------

/// Replace `[text](url)` with `text`.
fn collapse_links(md: &str) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"));

    LINK_RE.replace_all(md, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of three or more newlines into exactly two.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_image_removed_with_text_intact() {
        let input = "Before ![alt](data:image/png;base64,AAAA) after";
        assert_eq!(cleanup(input), "Before  after");
    }

    #[test]
    fn image_spanning_lines_removed() {
        let input = "Logo: ![company\nlogo](https://cdn.example/logo.png\n) done";
        assert_eq!(cleanup(input), "Logo:  done");
    }

    #[test]
    fn link_collapses_to_text() {
        assert_eq!(cleanup("[Click here](https://x.example/y)"), "Click here");
    }

    #[test]
    fn link_inside_sentence() {
        assert_eq!(
            cleanup("See our [payment options](/pagamento) for details."),
            "See our payment options for details."
        );
    }

    #[test]
    fn empty_brackets_are_not_links() {
        assert_eq!(collapse_links("[](https://x.example)"), "[](https://x.example)");
    }

    #[test]
    fn blank_line_runs_collapse_to_two() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn surrounding_whitespace_trimmed() {
        assert_eq!(cleanup("\n\n  # Title\n\nBody  \n\n"), "# Title\n\nBody");
    }

    #[test]
    fn nested_markup_reaches_fixpoint() {
        let input = "[[inner](a)](b) and ![x](y)![z](w) end";
        let once = cleanup(input);
        assert_eq!(cleanup(&once), once);
        assert!(!once.contains("]("), "{once}");
    }

    #[test]
    fn cleanup_is_idempotent() {
        let inputs = [
            "",
            "plain text",
            "# Heading\n\n\n\n\nParagraph with [a link](https://example.com).\n\n![img](x.png)",
            "![a](b)[c](d)\n\n\n\n[e]\n(f)",
            "![unterminated](oops\n\n\n\ntext",
            "   \n\n\n   ",
            "[x](y)[z](w)!\n\n\n![q](r)",
            "![![nested](a)](b)",
        ];
        for input in inputs {
            let once = cleanup(input);
            assert_eq!(cleanup(&once), once, "input: {input:?}");
        }
    }
}
