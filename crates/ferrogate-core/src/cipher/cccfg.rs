// ============================================
// File: crates/ferrogate-core/src/cipher/cccfg.rs
// ============================================
//! # cccfg — Single-Shot Config Cipher
//!
//! ## Creation Reason
//! Datagram-flavored framing used by configuration pulls: the whole message
//! is one base64 blob, AES-ECB under a fixed key with zero padding and no
//! trailing delimiter.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Reads are a single call capped at 4096 bytes, so over a byte stream a
//!   message split across reads is truncated; this cipher is effectively a
//!   datagram cipher and is kept that way for interop

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::cipher::{decode_key16, NetReader, NetWriter, TransCipher};
use crate::crypto::block::{aes_ecb_decrypt, aes_ecb_encrypt};
use crate::crypto::pad::zero_pad;
use crate::crypto::AES_BLOCK_LEN;
use crate::error::{CoreError, Result};
use crate::protocol::SessionContext;

/// Largest message accepted in one read.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Fixed-key ECB single-shot cipher.
#[derive(Debug)]
pub struct CccfgCipher {
    key: [u8; 16],
}

impl CccfgCipher {
    /// Creates the cipher from a raw key.
    #[must_use]
    pub const fn new(key: [u8; 16]) -> Self {
        Self { key }
    }

    /// Creates the cipher from a base64-encoded key.
    pub fn from_base64(key_b64: &str) -> Result<Self> {
        Ok(Self::new(decode_key16("aes_key", key_b64)?))
    }
}

#[async_trait]
impl TransCipher for CccfgCipher {
    async fn encode_write(
        &self,
        _ctx: &mut SessionContext,
        w: &mut NetWriter<'_>,
        data: &[u8],
    ) -> Result<()> {
        let padded = zero_pad(data, AES_BLOCK_LEN)?;
        let encrypted = aes_ecb_encrypt(&self.key, &padded)?;
        w.write_all(BASE64.encode(encrypted).as_bytes()).await?;
        Ok(())
    }

    async fn decode_read(
        &self,
        ctx: &mut SessionContext,
        r: &mut NetReader<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; MAX_MESSAGE_LEN];
        let n = r.read(&mut buf).await?;
        if n == 0 {
            return Err(CoreError::bad_frame("read empty message"));
        }
        if ctx.log_verbose() {
            debug!(peer = %ctx.peer(), len = n, "received message");
        }
        let raw = BASE64
            .decode(&buf[..n])
            .map_err(|e| CoreError::bad_frame(format!("message is not valid base64: {e}")))?;
        Ok(Some(aes_ecb_decrypt(&self.key, &raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    fn test_ctx() -> SessionContext {
        SessionContext::new("127.0.0.1:6000".parse().unwrap())
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let cipher = CccfgCipher::new([0x0f; 16]);
        let mut ctx = test_ctx();
        let plaintext = b"region=eu&build=2207";

        let mut out = Cursor::new(Vec::new());
        cipher
            .encode_write(&mut ctx, &mut out, plaintext)
            .await
            .unwrap();
        let wire = out.into_inner();

        // No trailing delimiter.
        assert!(!wire.ends_with(b"\n"));
        assert!(wire.iter().all(|b| b.is_ascii()));

        let mut reader = BufReader::new(wire.as_slice());
        let decoded = cipher
            .decode_read(&mut ctx, &mut reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&decoded[..plaintext.len()], plaintext);
        assert!(decoded[plaintext.len()..].iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn test_empty_read_rejected() {
        let cipher = CccfgCipher::new([0x0f; 16]);
        let mut ctx = test_ctx();
        let mut reader = BufReader::new(&b""[..]);
        let err = cipher.decode_read(&mut ctx, &mut reader).await.unwrap_err();
        assert!(matches!(err, CoreError::BadFrame { .. }));
    }

    #[tokio::test]
    async fn test_bad_base64_rejected() {
        let cipher = CccfgCipher::new([0x0f; 16]);
        let mut ctx = test_ctx();
        let mut reader = BufReader::new(&b"%%%"[..]);
        let err = cipher.decode_read(&mut ctx, &mut reader).await.unwrap_err();
        assert!(matches!(err, CoreError::BadFrame { .. }));
    }
}
