// ============================================
// File: crates/ferrogate-core/src/cipher/plain.rs
// ============================================
//! # plain — Pass-Through Cipher
//!
//! No encryption and no framing: reads to end of input, writes raw bytes.
//! Intended for trusted loopback listeners and for exercising decoders and
//! handlers without crypto.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::cipher::{NetReader, NetWriter, TransCipher};
use crate::error::Result;
use crate::protocol::SessionContext;

/// Identity cipher.
#[derive(Debug)]
pub struct PlainCipher;

#[async_trait]
impl TransCipher for PlainCipher {
    async fn encode_write(
        &self,
        _ctx: &mut SessionContext,
        w: &mut NetWriter<'_>,
        data: &[u8],
    ) -> Result<()> {
        w.write_all(data).await?;
        Ok(())
    }

    async fn decode_read(
        &self,
        _ctx: &mut SessionContext,
        r: &mut NetReader<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let mut data = Vec::new();
        r.read_to_end(&mut data).await?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_identity_roundtrip() {
        let cipher = PlainCipher;
        let mut ctx = SessionContext::new("127.0.0.1:7000".parse().unwrap());

        let mut out = Cursor::new(Vec::new());
        cipher
            .encode_write(&mut ctx, &mut out, b"\x05\x00payload")
            .await
            .unwrap();
        let wire = out.into_inner();
        assert_eq!(wire, b"\x05\x00payload");

        let mut reader = BufReader::new(wire.as_slice());
        let decoded = cipher
            .decode_read(&mut ctx, &mut reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded, b"\x05\x00payload");
    }

    #[tokio::test]
    async fn test_empty_input_is_silent() {
        let cipher = PlainCipher;
        let mut ctx = SessionContext::new("127.0.0.1:7000".parse().unwrap());
        let mut reader = BufReader::new(&b""[..]);
        assert!(cipher
            .decode_read(&mut ctx, &mut reader)
            .await
            .unwrap()
            .is_none());
    }
}
