// ============================================
// File: crates/ferrogate-core/src/decode/web.rs
// ============================================
//! # Signed Web Envelope (web)
//!
//! Base64 JSON `{Api, App, Nonce, Data, Sig}` where `Sig` is the lowercase
//! hex MD5 of `api&app&nonce&data&secret` and the secret comes from the
//! handler's per-app table. Signature comparison is case-insensitive.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::api::ApiHandler;
use crate::crypto::block::md5_concat;
use crate::decode::{trim_nulls, PayloadDecoder};
use crate::error::{CoreError, Result};

#[derive(Deserialize)]
struct WebEnvelope<'a> {
    #[serde(rename = "Api", default)]
    api: String,
    #[serde(rename = "App", default)]
    app: String,
    #[serde(rename = "Nonce", default)]
    nonce: u64,
    #[serde(rename = "Data", borrow)]
    data: Option<&'a RawValue>,
    #[serde(rename = "Sig", default)]
    sig: String,
}

/// Decoder for the MD5-signed web envelope.
pub struct WebDecoder {
    handler: Arc<dyn ApiHandler>,
}

impl WebDecoder {
    /// Creates the decoder bound to its handler's secret table.
    #[must_use]
    pub fn new(handler: Arc<dyn ApiHandler>) -> Self {
        Self { handler }
    }

    fn expected_sig(&self, envelope: &WebEnvelope<'_>) -> String {
        let secret = self.handler.query_app_secret_key(&envelope.app);
        let data = envelope.data.map_or("", |d| d.get());
        let material = format!(
            "{}&{}&{}&{}&{}",
            envelope.api, envelope.app, envelope.nonce, data, secret
        );
        hex::encode(md5_concat(&[material.as_bytes()]))
    }
}

impl PayloadDecoder for WebDecoder {
    fn decode(&self, buf: &[u8]) -> Result<(i32, Vec<u8>)> {
        let text = trim_nulls(buf);
        let raw = BASE64
            .decode(text)
            .map_err(|e| CoreError::bad_envelope(format!("envelope is not base64: {e}")))?;

        let envelope: WebEnvelope<'_> = serde_json::from_slice(&raw)
            .map_err(|e| CoreError::bad_envelope(format!("invalid web envelope: {e}")))?;

        let expected = self.expected_sig(&envelope);
        if !expected.eq_ignore_ascii_case(&envelope.sig) {
            return Err(CoreError::bad_envelope("signature mismatch"));
        }

        let payload = envelope
            .data
            .map(|d| d.get().as_bytes().to_vec())
            .unwrap_or_default();
        Ok((self.handler.sapi_to_code(&envelope.api), payload))
    }
}
