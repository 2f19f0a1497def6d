//! Image format detection from magic bytes.

/// MIME type of an encoded image, judged by its leading bytes.
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        _ => None,
    }
}

/// True when the bytes look like an encoded raster image.
///
/// WMS servers answer some failures with HTTP 200 and an XML
/// `ServiceException` body; those fail this check.
pub fn is_image(bytes: &[u8]) -> bool {
    sniff_content_type(bytes).is_some()
}
