//! Payload codec.
//!
//! A payload is either a literal JSON object or a quoted base64 string
//! holding a raw-deflate (no zlib header) compressed JSON document.

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use serde_json::Value;

use crate::error::{IngestionError, Result};

const UTF8_BOM: char = '\u{feff}';

/// Decode a record payload into a JSON value.
///
/// Literal JSON is tried first. Otherwise, when `zipped` is set, the text is
/// base64 decoded and inflated before parsing.
pub fn decode_payload(text: &str, zipped: bool) -> Result<Value> {
    let text = text.trim();
    if text.starts_with('{') {
        return serde_json::from_str(text).map_err(|e| IngestionError::decode(e.to_string()));
    }
    if !zipped {
        return Err(IngestionError::decode("payload is not a JSON object"));
    }

    let inflated = inflate(text.trim_matches('"'))?;
    let inner = inflated.trim_start_matches(UTF8_BOM);
    if !inner.trim_start().starts_with('{') {
        return Err(IngestionError::decode(
            "compressed payload is not a JSON object",
        ));
    }
    serde_json::from_str(inner).map_err(|e| IngestionError::decode(e.to_string()))
}

/// base64 -> raw deflate -> UTF-8 text
fn inflate(encoded: &str) -> Result<String> {
    let compressed = STANDARD
        .decode(encoded)
        .map_err(|e| IngestionError::decode(format!("base64: {e}")))?;

    let mut text = String::new();
    DeflateDecoder::new(compressed.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| IngestionError::decode(format!("deflate: {e}")))?;
    Ok(text)
}

/// Compress a JSON document the way the feed does. Used to build fixtures.
pub fn encode_zipped(document: &Value) -> Result<String> {
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(document.to_string().as_bytes())
        .map_err(|e| IngestionError::decode(format!("deflate: {e}")))?;
    let bytes = encoder
        .finish()
        .map_err(|e| IngestionError::decode(format!("deflate: {e}")))?;
    Ok(format!("\"{}\"", STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_json() {
        let value = decode_payload(r#"{"Lines": {}}"#, false).unwrap();
        assert!(value.get("Lines").is_some());
    }

    #[test]
    fn test_zipped_round_trip() {
        let doc = json!({"Entries": [{"Utc": "2024-03-02T15:03:12.25Z", "Cars": {}}]});
        let encoded = encode_zipped(&doc).unwrap();
        assert!(encoded.starts_with('"'));
        assert_eq!(decode_payload(&encoded, true).unwrap(), doc);
    }

    #[test]
    fn test_zipped_payload_rejected_on_plain_page() {
        let encoded = encode_zipped(&json!({"a": 1})).unwrap();
        assert!(decode_payload(&encoded, false).is_err());
    }

    #[test]
    fn test_corrupt_payloads() {
        assert!(decode_payload("\"not-base64!!\"", true).is_err());
        // valid base64, not deflate
        assert!(decode_payload("\"aGVsbG8gd29ybGQ=\"", true).is_err());
        assert!(decode_payload("{\"truncated\": ", true).is_err());
    }
}
