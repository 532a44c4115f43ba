//! Upload constants shared by the upload routes and key generation.

/// Content types accepted for goal cover images.
pub const ALLOWED_IMAGE_CONTENT_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/avif",
];

/// Upload size ceiling enforced by the upload routes.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub fn is_allowed_image_content_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_CONTENT_TYPES.contains(&content_type)
}

/// File extension used when generating keys for an allowed image content type.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

/// Content type served for a stored object, derived from its key's extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let extension = key
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase());

    match extension.as_deref() {
        Some("avif") => "image/avif",
        Some("gif") => "image/gif",
        Some("jpeg") | Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_allowed_type_has_an_extension() {
        for content_type in ALLOWED_IMAGE_CONTENT_TYPES {
            let ext = extension_for_content_type(content_type).unwrap();
            let served = content_type_for_key(&format!("covers/x.{}", ext));
            assert!(is_allowed_image_content_type(served));
        }
    }

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(content_type_for_key("goals/covers/a.PNG"), "image/png");
        assert_eq!(content_type_for_key("goals/covers/a.jpeg"), "image/jpeg");
        assert_eq!(
            content_type_for_key("goals/covers/README"),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for_key("dir.png/file"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_unknown_content_type_has_no_extension() {
        assert_eq!(extension_for_content_type("image/svg+xml"), None);
        assert!(!is_allowed_image_content_type("image/svg+xml"));
    }
}
