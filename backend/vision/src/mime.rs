//! Image MIME detection for downloaded bytes and declared content types.

/// Detect an image MIME type from its leading magic bytes.
/// Falls back to `image/jpeg`, which vision APIs accept for unknown input.
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'B', b'M', ..] => "image/bmp",
        [_, _, _, _, b'f', b't', b'y', b'p', b'a', b'v', b'i', b'f', ..] => "image/avif",
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => "image/tiff",
        _ => "image/jpeg",
    }
}

/// The media type part of a `Content-Type` header, lower-cased.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    media_type(mime).starts_with("image/")
}

/// Whether a MIME type is an HTML page.
pub fn is_html(mime: &str) -> bool {
    media_type(mime) == "text/html"
}
