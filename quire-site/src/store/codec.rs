//! Canonical document encoding
//!
//! On disk the collection is pretty-printed JSON with two-space indentation.
//! For transport through the contents API that text is base64-encoded
//! (standard alphabet, padded). The hosted API wraps base64 it returns at
//! 60 columns, so decoding ignores ASCII whitespace.

use base64::{engine::general_purpose, Engine as _};
use quire_common::{Collection, Poem};

use crate::error::{SiteError, SiteResult};

/// Serialize a collection to its canonical JSON text
pub fn encode_document(data: &[Poem]) -> SiteResult<String> {
    serde_json::to_string_pretty(data).map_err(|e| SiteError::Common(e.into()))
}

/// Parse a collection from JSON bytes
///
/// A document that is not an array of records is reported as
/// `StoreUnavailable`: the store handed back something unusable.
pub fn decode_document(bytes: &[u8]) -> SiteResult<Collection> {
    serde_json::from_slice(bytes)
        .map_err(|e| SiteError::StoreUnavailable(format!("malformed poem document: {}", e)))
}

/// Canonical JSON, base64-encoded for transport
pub fn encode_transport(data: &[Poem]) -> SiteResult<String> {
    let text = encode_document(data)?;
    Ok(general_purpose::STANDARD.encode(text.as_bytes()))
}

/// Decode transport base64 back into the JSON text it carries
pub fn decode_transport_text(encoded: &str) -> SiteResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SiteError::StoreUnavailable(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| SiteError::StoreUnavailable(format!("content is not UTF-8: {}", e)))
}

/// Decode transport base64 into a collection
pub fn decode_transport(encoded: &str) -> SiteResult<Collection> {
    let text = decode_transport_text(encoded)?;
    decode_document(text.as_bytes())
}
