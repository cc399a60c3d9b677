//! Filename derivation from media URIs.

use percent_encoding::percent_decode_str;

/// Derives a local filename from the last path segment of a URI, with
/// percent-escapes decoded (Wikimedia media URLs escape commas and spaces).
///
/// Returns `None` if the URI cannot be parsed or has no usable segment.
pub fn filename_from_uri(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(uri).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    Some(decoded.into_owned())
}
