//! Response body decoding.
//!
//! The charset comes from the `Content-Type` header, then from a `<meta>`
//! declaration near the top of the document. Undeclared bodies are taken as
//! UTF-8 when they are valid UTF-8 and otherwise sniffed with `chardetng`.

use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use tracing::debug;

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SCAN_BYTES: usize = 1024;

static HEADER_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_:.\-]+)"#).expect("valid regex")
});

/// Matches both `<meta charset=..>` and the `http-equiv` content form.
static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([A-Za-z0-9_:.\-]+)"#).expect("valid regex")
});

/// Decode an HTML body to UTF-8.
pub fn decode_html(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|ct| label_encoding(&HEADER_CHARSET_RE, ct))
        .or_else(|| {
            let head = String::from_utf8_lossy(&body[..body.len().min(META_SCAN_BYTES)]);
            label_encoding(&META_CHARSET_RE, &head)
        })
        .unwrap_or_else(|| sniff(body));

    let (text, used, malformed) = encoding.decode(body);
    debug!(encoding = used.name(), malformed, "decoded response body");
    text.into_owned()
}

fn label_encoding(re: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = re.captures(haystack)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

fn sniff(body: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(body).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    detector.guess(None, true)
}
