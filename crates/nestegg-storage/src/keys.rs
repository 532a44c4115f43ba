//! Storage key normalization and URL construction shared by every backend.

use crate::traits::{StorageError, StorageResult};
use nestegg_core::constants::extension_for_content_type;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use uuid::Uuid;

/// Characters left literal inside a key segment (the `encodeURIComponent` set).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A validated, relative storage key.
///
/// Only constructible through [`StorageKey::normalize`], so holding one means
/// the key is non-empty, has no leading slash, uses `/` separators and has no
/// `.` or `..` segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Canonicalize a raw key.
    ///
    /// Turns backslashes into slashes, then strips leading slashes and
    /// surrounding whitespace. Fails with [`StorageError::InvalidKey`] when
    /// nothing is left or when any segment is `.` or `..`.
    pub fn normalize(raw: &str) -> StorageResult<Self> {
        let replaced = raw.replace('\\', "/");
        let normalized = replaced
            .trim_start_matches(|c: char| c == '/' || c.is_whitespace())
            .trim_end();
        if normalized.is_empty() {
            return Err(StorageError::InvalidKey(
                "Storage key is required".to_string(),
            ));
        }

        if normalized
            .split('/')
            .any(|segment| segment == "." || segment == "..")
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid path segments".to_string(),
            ));
        }

        Ok(StorageKey(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Percent-encode each `/`-delimited segment of a key, keeping the slashes.
pub fn encode_storage_key(key: &StorageKey) -> String {
    key.as_str()
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a base URL (or route path) with an encoded key.
///
/// An empty base yields the encoded key alone; otherwise trailing slashes on
/// the base are dropped and exactly one `/` separates the two.
pub fn join_url(base: &str, key: &StorageKey) -> String {
    if base.is_empty() {
        return encode_storage_key(key);
    }
    format!("{}/{}", base.trim_end_matches('/'), encode_storage_key(key))
}

/// Generate a fresh cover-image key for an allowed image content type.
///
/// Layout: `goals/covers/{uuid}.{ext}`.
pub fn cover_image_key(content_type: &str) -> StorageResult<StorageKey> {
    let extension = extension_for_content_type(content_type).ok_or_else(|| {
        StorageError::InvalidKey(format!("No file extension for content type {}", content_type))
    })?;
    StorageKey::normalize(&format!("goals/covers/{}.{}", Uuid::new_v4(), extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(raw: &str) -> StorageKey {
        StorageKey::normalize(raw).unwrap()
    }

    #[test]
    fn test_rejects_traversal() {
        for raw in ["../x", "a/../b", "./x", "a/.", "..", "a\\..\\b"] {
            let result = StorageKey::normalize(raw);
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_rejects_empty() {
        for raw in ["", "   ", "/", "///", " / "] {
            assert!(matches!(
                StorageKey::normalize(raw),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_backslashes_become_slashes() {
        assert_eq!(key("a\\b"), key("a/b"));
        assert_eq!(key("a\\b").as_str(), "a/b");
    }

    #[test]
    fn test_strips_leading_slashes() {
        assert_eq!(key("/a/b").as_str(), "a/b");
        assert_eq!(key("  ///goals/covers/x.png ").as_str(), "goals/covers/x.png");
        assert_eq!(key("\\\\share\\x.png").as_str(), "share/x.png");
        assert_eq!(key("/ /a").as_str(), "a");
    }

    #[test]
    fn test_dots_inside_segments_are_fine() {
        assert_eq!(key("a/..b/c.").as_str(), "a/..b/c.");
        assert_eq!(key("covers/.hidden").as_str(), "covers/.hidden");
    }

    #[test]
    fn test_join_url_with_base() {
        assert_eq!(
            join_url("https://cdn.example.com", &key("covers/my file.jpg")),
            "https://cdn.example.com/covers/my%20file.jpg"
        );
        assert_eq!(
            join_url("https://cdn.example.com///", &key("covers/a.jpg")),
            "https://cdn.example.com/covers/a.jpg"
        );
        assert_eq!(
            join_url("/api/storage/local-file", &key("goals/covers/abc.png")),
            "/api/storage/local-file/goals/covers/abc.png"
        );
    }

    #[test]
    fn test_join_url_empty_base() {
        assert_eq!(
            join_url("", &key("covers/my file.jpg")),
            "covers/my%20file.jpg"
        );
    }

    #[test]
    fn test_encode_reserved_characters() {
        assert_eq!(
            encode_storage_key(&key("a b/c?d#e/f&g=h/(x)!~*'")),
            "a%20b/c%3Fd%23e/f%26g%3Dh/(x)!~*'"
        );
        assert_eq!(encode_storage_key(&key("café/ü.png")), "caf%C3%A9/%C3%BC.png");
    }

    #[test]
    fn test_cover_image_key() {
        let generated = cover_image_key("image/jpeg").unwrap();
        assert!(generated.as_str().starts_with("goals/covers/"));
        assert!(generated.as_str().ends_with(".jpg"));
        assert_ne!(generated, cover_image_key("image/jpeg").unwrap());
        assert!(cover_image_key("text/html").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_normalize_is_idempotent(raw in "[ /\\\\]{0,3}[a-zA-Z0-9 ._\\-/\\\\]{0,40}") {
            if let Ok(once) = StorageKey::normalize(&raw) {
                let twice = StorageKey::normalize(once.as_str()).unwrap();
                prop_assert_eq!(once, twice);
            }
        }

        #[test]
        fn prop_normalized_keys_hold_invariants(raw in "\\PC{0,40}") {
            if let Ok(normalized) = StorageKey::normalize(&raw) {
                let s = normalized.as_str();
                prop_assert!(!s.is_empty());
                prop_assert!(!s.starts_with('/'));
                prop_assert!(!s.contains('\\'));
                prop_assert!(s.split('/').all(|seg| seg != "." && seg != ".."));
            }
        }

        #[test]
        fn prop_join_preserves_segment_count(segments in prop::collection::vec("[a-z0-9][a-z0-9 %?#]{0,7}", 1..5)) {
            let raw = segments.join("/");
            let k = StorageKey::normalize(&raw).unwrap();
            let joined = join_url("https://cdn.example.com/", &k);
            let path = joined.trim_start_matches("https://cdn.example.com/");
            prop_assert_eq!(path.split('/').count(), segments.len());
        }
    }
}
