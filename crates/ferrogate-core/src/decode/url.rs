// ============================================
// File: crates/ferrogate-core/src/decode/url.rs
// ============================================
//! # URL-Encoded Envelope (nj11)
//!
//! Form-urlencoded body with a base64 `data` (or `Data`) field and a
//! `type` field naming the API.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::api::ApiHandler;
use crate::decode::{trim_nulls, PayloadDecoder};
use crate::error::{CoreError, Result};

/// Decoder for `application/x-www-form-urlencoded` envelopes.
pub struct UrlDecoder {
    handler: Arc<dyn ApiHandler>,
}

impl UrlDecoder {
    /// Creates the decoder bound to its handler's API name table.
    #[must_use]
    pub fn new(handler: Arc<dyn ApiHandler>) -> Self {
        Self { handler }
    }
}

impl PayloadDecoder for UrlDecoder {
    fn decode(&self, buf: &[u8]) -> Result<(i32, Vec<u8>)> {
        let text = trim_nulls(buf);

        let mut data_lower: Option<String> = None;
        let mut data_upper: Option<String> = None;
        let mut api_name = String::new();
        for (key, value) in form_urlencoded::parse(text) {
            match &*key {
                // First occurrence wins for each field.
                "data" if data_lower.is_none() => data_lower = Some(value.into_owned()),
                "Data" if data_upper.is_none() => data_upper = Some(value.into_owned()),
                "type" if api_name.is_empty() => api_name = value.into_owned(),
                _ => {}
            }
        }

        let data = data_lower
            .filter(|d| !d.is_empty())
            .or_else(|| data_upper.filter(|d| !d.is_empty()))
            .ok_or_else(|| CoreError::bad_envelope("missing data field"))?;

        let payload = BASE64
            .decode(data.as_bytes())
            .map_err(|e| CoreError::bad_envelope(format!("data field is not base64: {e}")))?;

        Ok((self.handler.sapi_to_code(&api_name), payload))
    }
}
