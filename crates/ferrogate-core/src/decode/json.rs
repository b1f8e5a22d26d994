// ============================================
// File: crates/ferrogate-core/src/decode/json.rs
// ============================================
//! # JSON Envelope (sz12)
//!
//! JSON object `{Api: string, Data: <raw json>}`; the `Data` member is
//! passed through verbatim so handlers parse their own schema.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::api::ApiHandler;
use crate::decode::{trim_nulls, PayloadDecoder};
use crate::error::{CoreError, Result};

#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "Api", default)]
    api: String,
    #[serde(rename = "Data", borrow)]
    data: Option<&'a RawValue>,
}

/// Decoder for JSON `{Api, Data}` envelopes.
pub struct JsonDecoder {
    handler: Arc<dyn ApiHandler>,
}

impl JsonDecoder {
    /// Creates the decoder bound to its handler's API name table.
    #[must_use]
    pub fn new(handler: Arc<dyn ApiHandler>) -> Self {
        Self { handler }
    }
}

impl PayloadDecoder for JsonDecoder {
    fn decode(&self, buf: &[u8]) -> Result<(i32, Vec<u8>)> {
        let trimmed = trim_nulls(buf);
        if trimmed.is_empty() {
            return Err(CoreError::bad_envelope("empty payload"));
        }
        let text = std::str::from_utf8(trimmed)
            .map_err(|_| CoreError::bad_envelope("payload is not utf-8"))?;
        // Legacy peers embed literal newlines inside the envelope.
        let cleaned = text.replace('\n', "");

        let envelope: Envelope<'_> = serde_json::from_str(&cleaned)
            .map_err(|e| CoreError::bad_envelope(format!("invalid json envelope: {e}")))?;

        let payload = envelope
            .data
            .map(|d| d.get().as_bytes().to_vec())
            .unwrap_or_default();
        Ok((self.handler.sapi_to_code(&envelope.api), payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testutil::StubHandler;

    fn decoder() -> JsonDecoder {
        JsonDecoder::new(Arc::new(StubHandler))
    }

    #[test]
    fn test_decode_envelope() {
        let (api, payload) = decoder()
            .decode(br#"{"Api":"ping","Data":{"x":1}}"#)
            .unwrap();
        assert_eq!(api, 1);
        assert_eq!(payload, br#"{"x":1}"#);
    }

    #[test]
    fn test_decode_with_nulls_and_newlines() {
        let (api, payload) = decoder()
            .decode(b"{\"Api\":\"echo\",\n\"Data\":[1,\n2]}\x00\x00")
            .unwrap();
        assert_eq!(api, 2);
        assert_eq!(payload, b"[1,2]");
    }

    #[test]
    fn test_missing_data_yields_empty_payload() {
        let (api, payload) = decoder().decode(br#"{"Api":"ping"}"#).unwrap();
        assert_eq!(api, 1);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_unknown_api_name_maps_through_handler() {
        let (api, _) = decoder().decode(br#"{"Api":"nope","Data":1}"#).unwrap();
        assert_eq!(api, -1);
    }

    #[test]
    fn test_empty_payload_rejected() {
        let err = decoder().decode(b"\x00\x00").unwrap_err();
        assert!(matches!(err, CoreError::BadEnvelope { .. }));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = decoder().decode(b"{not json").unwrap_err();
        assert!(matches!(err, CoreError::BadEnvelope { .. }));
    }
}
