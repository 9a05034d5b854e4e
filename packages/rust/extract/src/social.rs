//! Social profile detection from anchor targets.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use sitedigest_shared::SocialPlatform;

static INSTAGRAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)instagram\.com/[\w.]+").expect("valid regex"));
static FACEBOOK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)facebook\.com/[\w.]+").expect("valid regex"));
static LINKEDIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)linkedin\.com/(?:company|in)/[\w-]+").expect("valid regex")
});
// `x.com` must start a host label, otherwise `box.com/...` would match.
static TWITTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[/.@])(?:twitter|x)\.com/\w+").expect("valid regex")
});
static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)youtube\.com/(?:c|channel|user)/[\w-]+").expect("valid regex")
});

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

fn pattern(platform: SocialPlatform) -> &'static Regex {
    match platform {
        SocialPlatform::Instagram => &*INSTAGRAM_RE,
        SocialPlatform::Facebook => &*FACEBOOK_RE,
        SocialPlatform::Linkedin => &*LINKEDIN_RE,
        SocialPlatform::Twitter => &*TWITTER_RE,
        SocialPlatform::Youtube => &*YOUTUBE_RE,
    }
}

/// Platforms whose profile pattern `href` satisfies.
pub fn classify_profile(href: &str) -> Vec<SocialPlatform> {
    SocialPlatform::ALL
        .into_iter()
        .filter(|&p| pattern(p).is_match(href))
        .collect()
}

/// Group every anchor target in `doc` by the platforms it matches.
///
/// Hrefs are kept verbatim, in document order. Platforms with no match are absent.
pub(crate) fn social_profiles(doc: &Html) -> BTreeMap<SocialPlatform, Vec<String>> {
    let mut profiles: BTreeMap<SocialPlatform, Vec<String>> = BTreeMap::new();

    for anchor in doc.select(&ANCHOR_SEL) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        for platform in classify_profile(href) {
            profiles.entry(platform).or_default().push(href.to_string());
        }
    }

    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkedin_needs_company_or_in_segment() {
        assert_eq!(
            classify_profile("https://www.linkedin.com/company/acme-ltda"),
            vec![SocialPlatform::Linkedin]
        );
        assert_eq!(
            classify_profile("https://linkedin.com/in/jane-doe"),
            vec![SocialPlatform::Linkedin]
        );
        assert!(classify_profile("https://linkedin.com/feed").is_empty());
    }

    #[test]
    fn twitter_and_x_hosts() {
        assert_eq!(
            classify_profile("https://x.com/acme"),
            vec![SocialPlatform::Twitter]
        );
        assert_eq!(
            classify_profile("https://mobile.Twitter.com/acme"),
            vec![SocialPlatform::Twitter]
        );
        assert!(classify_profile("https://box.com/files").is_empty());
    }

    #[test]
    fn youtube_path_shapes() {
        assert_eq!(
            classify_profile("https://youtube.com/channel/UC123-abc"),
            vec![SocialPlatform::Youtube]
        );
        assert!(classify_profile("https://youtube.com/watch?v=abc").is_empty());
    }

    #[test]
    fn groups_hrefs_in_document_order() {
        let doc = Html::parse_document(
            r#"<html><body>
                <a href="https://instagram.com/acme">IG</a>
                <a href="https://facebook.com/acme.store">FB</a>
                <a href="https://instagram.com/acme.outlet">IG 2</a>
                <a href="/contato">Contato</a>
            </body></html>"#,
        );
        let profiles = social_profiles(&doc);

        assert_eq!(profiles.len(), 2);
        assert_eq!(
            profiles[&SocialPlatform::Instagram],
            vec!["https://instagram.com/acme", "https://instagram.com/acme.outlet"]
        );
        assert_eq!(
            profiles[&SocialPlatform::Facebook],
            vec!["https://facebook.com/acme.store"]
        );
        assert!(!profiles.contains_key(&SocialPlatform::Youtube));
    }
}
