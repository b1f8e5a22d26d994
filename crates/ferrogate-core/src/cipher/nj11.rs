// ============================================
// File: crates/ferrogate-core/src/cipher/nj11.rs
// ============================================
//! # nj11 — Line Cipher
//!
//! ## Creation Reason
//! Stateless symmetric framing for legacy peers: each message is one
//! CRLF-terminated base64 line, AES-CBC under a fixed configured key and
//! IV with zero padding.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Decoding does NOT unpad; payload decoders tolerate trailing zeros
//! - The key and IV are shared by all sessions of the listener

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing::debug;

use crate::cipher::{decode_key16, NetReader, NetWriter, TransCipher};
use crate::crypto::block::{aes_cbc_decrypt, aes_cbc_encrypt};
use crate::crypto::pad::zero_pad;
use crate::crypto::AES_BLOCK_LEN;
use crate::error::{CoreError, Result};
use crate::protocol::SessionContext;

/// Fixed-key CBC line cipher.
#[derive(Debug)]
pub struct Nj11Cipher {
    key: [u8; 16],
    iv: [u8; 16],
}

impl Nj11Cipher {
    /// Creates the cipher from raw key and IV.
    #[must_use]
    pub const fn new(key: [u8; 16], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    /// Creates the cipher from base64-encoded key and IV.
    pub fn from_base64(key_b64: &str, iv_b64: &str) -> Result<Self> {
        Ok(Self::new(
            decode_key16("aes_key", key_b64)?,
            decode_key16("aes_iv", iv_b64)?,
        ))
    }

    /// Reads one line, stripping the trailing CRLF or LF.
    async fn read_line(r: &mut NetReader<'_>) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let n = r.read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Err(CoreError::bad_frame("connection closed before a line"));
        }
        while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(line)
    }
}

#[async_trait]
impl TransCipher for Nj11Cipher {
    async fn encode_write(
        &self,
        _ctx: &mut SessionContext,
        w: &mut NetWriter<'_>,
        data: &[u8],
    ) -> Result<()> {
        let padded = zero_pad(data, AES_BLOCK_LEN)?;
        let encrypted = aes_cbc_encrypt(&self.key, &self.iv, &padded)?;
        let mut line = BASE64.encode(encrypted).into_bytes();
        line.extend_from_slice(b"\r\n");
        w.write_all(&line).await?;
        Ok(())
    }

    async fn decode_read(
        &self,
        ctx: &mut SessionContext,
        r: &mut NetReader<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let line = Self::read_line(r).await?;
        if ctx.log_verbose() {
            debug!(peer = %ctx.peer(), len = line.len(), "received line");
        }
        let raw = BASE64
            .decode(&line)
            .map_err(|e| CoreError::bad_frame(format!("line is not valid base64: {e}")))?;
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(aes_cbc_decrypt(&self.key, &self.iv, &raw)?))
    }
}
