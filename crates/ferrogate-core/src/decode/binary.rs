// ============================================
// File: crates/ferrogate-core/src/decode/binary.rs
// ============================================
//! # Binary Envelope (mt)
//!
//! A little-endian u16 API code followed by the raw payload.

use std::sync::Arc;

use crate::api::ApiHandler;
use crate::decode::PayloadDecoder;
use crate::error::{CoreError, Result};

/// Decoder for the compact binary envelope.
pub struct BinaryDecoder {
    handler: Arc<dyn ApiHandler>,
}

impl BinaryDecoder {
    /// Creates the decoder bound to its handler's numeric API table.
    #[must_use]
    pub fn new(handler: Arc<dyn ApiHandler>) -> Self {
        Self { handler }
    }
}

impl PayloadDecoder for BinaryDecoder {
    fn decode(&self, buf: &[u8]) -> Result<(i32, Vec<u8>)> {
        if buf.len() < 2 {
            return Err(CoreError::bad_envelope(format!(
                "binary envelope of {} bytes is too short",
                buf.len()
            )));
        }
        let code = u16::from_le_bytes([buf[0], buf[1]]);
        Ok((self.handler.api_to_code(i32::from(code)), buf[2..].to_vec()))
    }
}
