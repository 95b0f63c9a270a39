//! Content fingerprint used to spot the same creative across fetches.

use sha2::{Digest, Sha256};

/// Compute the creative fingerprint.
///
/// SHA-256 over `ssai:creative:media:adomain`, where `media` is the media
/// URLs joined with `,` and absent fields are empty strings. Lower-case hex.
/// Identity only; not a security boundary.
#[must_use]
pub fn creative_hash(
    ssai_creative_id: Option<&str>,
    creative_id: Option<&str>,
    media_urls: &[String],
    adomain: Option<&str>,
) -> String {
    let canonical = format!(
        "{}:{}:{}:{}",
        ssai_creative_id.unwrap_or(""),
        creative_id.unwrap_or(""),
        media_urls.join(","),
        adomain.unwrap_or(""),
    );
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| (*u).to_string()).collect()
    }

    #[test]
    fn matches_known_digest() {
        assert_eq!(
            creative_hash(None, None, &media(&["http://x/1.mp4"]), Some("foo.com")),
            "f6b8bb6db74689de00cfe9d3b88b3b672ad61dc7e5692f4b4a36d96b33aaefae"
        );
        assert_eq!(
            creative_hash(
                Some("ssai-1"),
                Some("cr-9"),
                &media(&["http://a/1.mp4", "http://a/2.mp4"]),
                Some("brand.com"),
            ),
            "2b12ce746894ca78bfb57e91ad428f897f78689c0aee8d563f0b06dfb6a82e06"
        );
    }

    #[test]
    fn all_absent_hashes_the_bare_separators() {
        assert_eq!(
            creative_hash(None, None, &[], None),
            "f1ae2a75ed1f99721f02ef869e2fb3d4df102fdd73e2d00b424a222f9c1ea69c"
        );
    }

    #[test]
    fn is_deterministic() {
        let urls = media(&["http://a/1.mp4"]);
        let a = creative_hash(Some("s"), Some("c"), &urls, Some("d.com"));
        let b = creative_hash(Some("s"), Some("c"), &urls, Some("d.com"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn each_field_changes_the_digest() {
        let urls = media(&["http://a/1.mp4"]);
        let base = creative_hash(Some("s"), Some("c"), &urls, Some("d.com"));

        assert_ne!(base, creative_hash(Some("s2"), Some("c"), &urls, Some("d.com")));
        assert_ne!(base, creative_hash(Some("s"), Some("c2"), &urls, Some("d.com")));
        assert_ne!(
            base,
            creative_hash(Some("s"), Some("c"), &media(&["http://a/2.mp4"]), Some("d.com"))
        );
        assert_ne!(base, creative_hash(Some("s"), Some("c"), &urls, Some("e.com")));
        assert_ne!(base, creative_hash(Some("s"), Some("c"), &urls, None));
    }

    #[test]
    fn absent_and_empty_fields_are_equivalent() {
        assert_eq!(
            creative_hash(None, None, &[], None),
            creative_hash(Some(""), Some(""), &[], Some(""))
        );
    }
}
