// ============================================
// File: crates/ferrogate-core/src/decode/mod.rs
// ============================================
//! # Payload Decoders
//!
//! ## Creation Reason
//! After the transport cipher recovers a plaintext buffer, a decoder turns
//! it into an `(api, payload)` pair for dispatch. The envelope shape is
//! independent of the cipher and selected separately in configuration.
//!
//! ## Variants
//! | name   | envelope                                        |
//! |--------|-------------------------------------------------|
//! | `nj11` | `application/x-www-form-urlencoded`, base64 data |
//! | `sz12` | JSON `{Api, Data}`                               |
//! | `mt`   | binary: u16 LE api code + raw payload            |
//! | `web`  | base64 JSON `{Api, App, Nonce, Data, Sig}`, MD5-signed |
//!
//! Malformed input fails with `BadEnvelope`; the connection layer then
//! closes or drops.
//!
//! ## Last Modified
//! v0.1.0 - Initial decoder variants

use std::sync::Arc;

use crate::api::ApiHandler;
use crate::error::{CoreError, Result};

pub mod binary;
pub mod json;
pub mod url;
pub mod web;

pub use binary::BinaryDecoder;
pub use json::JsonDecoder;
pub use url::UrlDecoder;
pub use web::WebDecoder;

/// Turns one decrypted buffer into an API code and payload bytes.
pub trait PayloadDecoder: Send + Sync {
    /// Decodes the envelope. Fails with `BadEnvelope` on malformed input.
    fn decode(&self, buf: &[u8]) -> Result<(i32, Vec<u8>)>;
}

/// Strips leading and trailing NUL bytes.
pub(crate) fn trim_nulls(buf: &[u8]) -> &[u8] {
    let start = buf.iter().position(|&b| b != 0).unwrap_or(buf.len());
    let end = buf.iter().rposition(|&b| b != 0).map_or(start, |i| i + 1);
    &buf[start..end]
}

/// Builds a payload decoder from its configured type name.
pub fn new_decoder(code_type: &str, handler: Arc<dyn ApiHandler>) -> Result<Box<dyn PayloadDecoder>> {
    match code_type {
        "nj11" => Ok(Box::new(UrlDecoder::new(handler))),
        "sz12" => Ok(Box::new(JsonDecoder::new(handler))),
        "mt" => Ok(Box::new(BinaryDecoder::new(handler))),
        "web" => Ok(Box::new(WebDecoder::new(handler))),
        other => Err(CoreError::UnsupportedVariant(other.to_string())),
    }
}
