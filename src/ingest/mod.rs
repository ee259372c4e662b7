// src/ingest/mod.rs
pub mod filter;
pub mod providers;
pub mod types;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is when a title is put into a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'~');

/// Decode an article identifier into its display title:
/// percent-decoding, `_` → space, whitespace collapsed and trimmed.
pub fn decode_title(identifier: &str) -> String {
    let decoded = percent_decode_str(identifier).decode_utf8_lossy();
    decoded
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inverse of [`decode_title`] for use in a URL path.
pub fn encode_title(title_or_identifier: &str) -> String {
    let canonical = decode_title(title_or_identifier).replace(' ', "_");
    utf8_percent_encode(&canonical, PATH_SEGMENT).to_string()
}

/// Lowercased decoded title, the form keyword matching works on.
pub fn match_key(identifier: &str) -> String {
    decode_title(identifier).to_lowercase()
}
