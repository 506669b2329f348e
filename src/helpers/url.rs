//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Characters escaped inside a slug path segment
const SLUG_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Route of a single post page
///
/// # Examples
/// ```ignore
/// post_href("hello-world") // -> "/posts/hello-world"
/// ```
pub fn post_href(slug: &str) -> String {
    format!("/posts/{}", encode_segment(slug))
}

/// Percent-encode one path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SLUG_SEGMENT).to_string()
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/posts/a") // -> "https://example.com/posts/a"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    format!(
        "{}/{}",
        config.url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_href() {
        assert_eq!(post_href("hello-world"), "/posts/hello-world");
        assert_eq!(post_href("v1.2_notes"), "/posts/v1.2_notes");
    }

    #[test]
    fn test_post_href_encodes_unsafe_chars() {
        assert_eq!(post_href("a b"), "/posts/a%20b");
        assert_eq!(post_href("what?"), "/posts/what%3F");
    }

    #[test]
    fn test_full_url_for() {
        let config = SiteConfig {
            url: "https://example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            full_url_for(&config, "/posts/a"),
            "https://example.com/posts/a"
        );
    }
}
