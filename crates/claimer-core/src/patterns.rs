//! URL patterns for sources, groups, and listings.
//!
//! Patterns are anchored at the start of the URL and unanchored at the end.
//! Source routing checks collection, then sale, then thread: a sale URL also
//! satisfies the broader group pattern, so the narrow patterns go first.

use regex::Regex;

use crate::error::{AppError, ParseFailure};
use crate::models::SourceKind;

const COLLECTION: &str = r"^.+itch\.io/c/.+";
const SALE: &str = r"^.+itch\.io/s/.+";
const GROUP: &str = r"^.+itch\.io/[sc]/\d+/.+";
const THREAD: &str = r"^.+(?P<thread>reddit\.com/r/.+/comments/.+)/.+";
const LISTING: &str = r"(http://|https://)?(?P<listing>.+\.itch\.io/[^/?]+)";

/// Compiled URL patterns, constructed once and shared by the extractors.
#[derive(Debug, Clone)]
pub struct SourcePatterns {
    collection: Regex,
    sale: Regex,
    group: Regex,
    thread: Regex,
    listing: Regex,
    listing_anchored: Regex,
}

impl SourcePatterns {
    /// Build patterns from explicit expressions.
    ///
    /// `listing` must define a `listing` capture group and `thread` a `thread`
    /// capture group.
    pub fn new(
        collection: &str,
        sale: &str,
        group: &str,
        thread: &str,
        listing: &str,
    ) -> Result<Self, AppError> {
        let compile = |name: &str, expr: &str| {
            Regex::new(expr)
                .map_err(|e| AppError::ConfigError(format!("Invalid {name} pattern: {e}")))
        };
        let thread = compile("thread", thread)?;
        let listing_anchored = compile("listing", &format!("^(?:{listing})"))?;
        let listing = compile("listing", listing)?;
        if !listing.capture_names().any(|n| n == Some("listing")) {
            return Err(AppError::ConfigError(
                "listing pattern must define a `listing` group".into(),
            ));
        }
        if !thread.capture_names().any(|n| n == Some("thread")) {
            return Err(AppError::ConfigError(
                "thread pattern must define a `thread` group".into(),
            ));
        }
        Ok(Self {
            collection: compile("collection", collection)?,
            sale: compile("sale", sale)?,
            group: compile("group", group)?,
            thread,
            listing,
            listing_anchored,
        })
    }

    /// Route a source URL to its kind.
    pub fn classify(&self, url: &str) -> Result<SourceKind, AppError> {
        if self.collection.is_match(url) {
            Ok(SourceKind::Collection)
        } else if self.sale.is_match(url) {
            Ok(SourceKind::Sale)
        } else if self.thread.is_match(url) {
            Ok(SourceKind::Thread)
        } else {
            Err(AppError::UnsupportedSource(url.to_string()))
        }
    }

    /// A sale or collection page.
    pub fn is_group(&self, url: &str) -> bool {
        self.group.is_match(url)
    }

    /// A URL that starts with a listing address.
    pub fn is_listing(&self, url: &str) -> bool {
        self.listing_anchored.is_match(url)
    }

    /// Reduce a URL to its listing root: `https://<user>.<host>/<slug>`.
    pub fn canonical_listing(&self, url: &str) -> Result<String, AppError> {
        self.listing
            .captures(url)
            .and_then(|c| c.name("listing"))
            .map(|m| format!("https://{}", m.as_str()))
            .ok_or_else(|| AppError::parsing(url, ParseFailure::InvalidListingUrl))
    }

    /// Base URL of a thread, without a trailing slash.
    pub fn thread_base(&self, url: &str) -> Result<String, AppError> {
        self.thread
            .captures(url)
            .and_then(|c| c.name("thread"))
            .map(|m| format!("https://{}", m.as_str()))
            .ok_or_else(|| AppError::UnsupportedSource(url.to_string()))
    }
}

impl Default for SourcePatterns {
    fn default() -> Self {
        Self::new(COLLECTION, SALE, GROUP, THREAD, LISTING)
            .unwrap_or_else(|e| unreachable!("built-in patterns are valid: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEGA_THREAD: &str =
        "https://old.reddit.com/r/FreeGameFindings/comments/i4ywei/itchio_mega_thread_7/";

    #[test]
    fn test_classify_precedence() {
        let p = SourcePatterns::default();
        assert_eq!(
            p.classify("https://itch.io/c/757294/games-to-help-you-stay-inside")
                .unwrap(),
            SourceKind::Collection
        );
        assert_eq!(
            p.classify("https://itch.io/s/21374/spring-sale").unwrap(),
            SourceKind::Sale
        );
        assert_eq!(
            p.classify(MEGA_THREAD).unwrap(),
            SourceKind::Thread
        );
    }

    #[test]
    fn test_classify_unsupported() {
        let p = SourcePatterns::default();
        let err = p.classify("https://example.com/page").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedSource(_)));
        assert!(p.classify("https://dev.itch.io/game").is_err());
    }

    #[test]
    fn test_sale_is_also_a_group() {
        let p = SourcePatterns::default();
        assert!(p.is_group("https://itch.io/s/21374/spring-sale"));
        assert!(p.is_group("https://itch.io/c/1/x"));
        assert!(!p.is_group("https://dev.itch.io/game"));
        assert!(!p.is_group("https://itch.io/s/spring"));
    }

    #[test]
    fn test_listing_match_and_canonical_form() {
        let p = SourcePatterns::default();
        assert!(p.is_listing("https://leafxel.itch.io/hojiya"));
        assert!(p.is_listing("leafxel.itch.io/hojiya"));
        assert!(!p.is_listing("https://itch.io/c/1/x"));
        assert_eq!(
            p.canonical_listing("http://leafxel.itch.io/hojiya?ref=abc").unwrap(),
            "https://leafxel.itch.io/hojiya"
        );
        assert_eq!(
            p.canonical_listing("https://leafxel.itch.io/hojiya/purchase").unwrap(),
            "https://leafxel.itch.io/hojiya"
        );
    }

    #[test]
    fn test_canonical_listing_rejects_non_listing() {
        let p = SourcePatterns::default();
        let err = p.canonical_listing("https://itch.io/c/1/x").unwrap_err();
        assert!(matches!(
            err,
            AppError::ParsingFailure {
                reason: ParseFailure::InvalidListingUrl,
                ..
            }
        ));
    }

    #[test]
    fn test_thread_base_drops_slug() {
        let p = SourcePatterns::default();
        assert_eq!(
            p.thread_base(MEGA_THREAD).unwrap(),
            "https://reddit.com/r/FreeGameFindings/comments/i4ywei"
        );
    }

    #[test]
    fn test_invalid_custom_pattern_is_config_error() {
        let err = SourcePatterns::new("(", SALE, GROUP, THREAD, LISTING).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        let err =
            SourcePatterns::new(COLLECTION, SALE, GROUP, THREAD, r".+\.itch\.io").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
