// ============================================
// File: crates/ferrogate-core/src/cipher/sz12.rs
// ============================================
//! # sz12 — Binary Session Cipher
//!
//! ## Creation Reason
//! The primary transport framing: length-prefixed binary frames whose first
//! message performs RSA key transport of a per-session AES key, with
//! deterministic IV evolution across the request/response exchange.
//!
//! ## Request Frame
//! ```text
//! ┌────────────┬──────────────┬─────────────────────┬───────────────────┐
//! │ length u32 │ header (28B) │ RSA block (k bytes) │ AES-CBC body opt. │
//! └────────────┴──────────────┴─────────────────────┴───────────────────┘
//! RSA cleartext = aes_key (16B) || first plaintext fragment
//! ```
//!
//! ## Response Frame
//! ```text
//! ┌────────────┬──────────────┬───────────┬────────────────┬───────────┐
//! │ length u32 │ header (28B) │ ack+1 u32 │ RSA sig (hs)   │ AES body  │
//! └────────────┴──────────────┴───────────┴────────────────┴───────────┘
//! signature present only on the handshake acknowledgment (msgtype 2)
//! ```
//!
//! ## Receive IV
//! - version 1: `nonce_le || nonce_le`
//! - version 2: `MD5(aes_key || nonce_le || seq_le)`
//!
//! ## Failure Ordering
//! Checksum verification precedes ACK advancement; RSA and padding
//! failures happen after it. A failed decode therefore leaves everything
//! but `ack`/`recv_sig` untouched, and a failure before the checksum check
//! leaves the context untouched entirely.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Stream chunks after the first frame are written raw (no header) and
//!   reuse the first frame's send IV; peers depend on this
//! - The length field of a stream's first frame advertises the total
//!   on-wire body size, not the first chunk's size
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use rsa::RsaPrivateKey;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::cipher::{NetReader, NetWriter, TransCipher};
use crate::crypto::block::{aes_cbc_decrypt, aes_cbc_encrypt, md5_concat};
use crate::crypto::pad::{pkcs7_pad, pkcs7_unpad};
use crate::crypto::{rsa as rsa_util, AES_BLOCK_LEN, AES_KEY_LEN};
use crate::error::{CoreError, Result};
use crate::protocol::context::{next_response_seq, state};
use crate::protocol::header::{
    frame_checksum, PacketHeader, ACK_FIELD_LEN, LENGTH_PREFIX_LEN, PACKET_HEADER_LEN,
    VERSION_CURRENT, VERSION_LEGACY,
};
use crate::protocol::SessionContext;

/// Upper bound on a single frame; anything larger is rejected as garbage.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Binary session cipher with RSA key transport.
#[derive(Debug)]
pub struct Sz12Cipher {
    key: RsaPrivateKey,
    modulus_len: usize,
}

impl Sz12Cipher {
    /// Creates the cipher from an RSA private key.
    #[must_use]
    pub fn new(key: RsaPrivateKey) -> Self {
        let modulus_len = rsa_util::modulus_len(&key);
        Self { key, modulus_len }
    }

    /// Creates the cipher from a base64 PKCS#1 DER private key.
    pub fn from_base64(key_b64: &str) -> Result<Self> {
        Ok(Self::new(rsa_util::parse_private_key_b64(key_b64)?))
    }

    /// Reads one length-prefixed frame (header + body, without the prefix).
    async fn read_frame(r: &mut NetReader<'_>) -> Result<Vec<u8>> {
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        r.read_exact(&mut prefix).await?;
        let length = u32::from_le_bytes(prefix) as usize;
        if length == 0 {
            return Err(CoreError::bad_frame("zero-length frame"));
        }
        if length > MAX_FRAME_LEN {
            return Err(CoreError::bad_frame(format!(
                "frame of {length} bytes exceeds limit"
            )));
        }
        let mut frame = vec![0u8; length];
        r.read_exact(&mut frame).await?;
        Ok(frame)
    }

    /// Derives the receive IV for a request header and session key.
    fn derive_recv_iv(hdr: &PacketHeader, aes_key: &[u8; AES_KEY_LEN]) -> Result<[u8; 16]> {
        match hdr.version {
            VERSION_LEGACY => {
                let mut iv = [0u8; 16];
                iv[..8].copy_from_slice(&hdr.nonce.to_le_bytes());
                iv[8..].copy_from_slice(&hdr.nonce.to_le_bytes());
                Ok(iv)
            }
            VERSION_CURRENT => Ok(md5_concat(&[
                aes_key,
                &hdr.nonce.to_le_bytes(),
                &hdr.seq.to_le_bytes(),
            ])),
            other => Err(CoreError::UnsupportedVersion(other)),
        }
    }

    /// Recovers the session key and plaintext from a request body.
    ///
    /// The first modulus-sized block is RSA key transport: 16 bytes of AES
    /// key followed by the leading plaintext fragment. Any remaining bytes
    /// are AES-CBC under the transported key and derived IV.
    fn decrypt_session_body(
        &self,
        ctx: &SessionContext,
        hdr: &PacketHeader,
        body: &[u8],
    ) -> Result<(Vec<u8>, [u8; AES_KEY_LEN], [u8; 16])> {
        let k = self.modulus_len;
        if body.len() < k {
            return Err(CoreError::InvalidDataLen(body.len()));
        }

        let clear = rsa_util::decrypt_pkcs1v15(&self.key, &body[..k])?;
        if clear.len() < AES_KEY_LEN {
            return Err(CoreError::rsa_failure(
                "recovered cleartext shorter than a session key",
            ));
        }
        let mut aes_key = [0u8; AES_KEY_LEN];
        aes_key.copy_from_slice(&clear[..AES_KEY_LEN]);
        let recv_iv = Self::derive_recv_iv(hdr, &aes_key)?;

        let mut plain = clear[AES_KEY_LEN..].to_vec();
        if body.len() > k {
            if ctx.log_verbose() {
                debug!(
                    peer = %ctx.peer(),
                    tail = body.len() - k,
                    "decrypting aes body"
                );
            }
            let decrypted = aes_cbc_decrypt(&aes_key, &recv_iv, &body[k..])?;
            let unpadded = pkcs7_unpad(&decrypted, AES_BLOCK_LEN)?;
            plain.extend_from_slice(unpadded);
        }
        Ok((plain, aes_key, recv_iv))
    }

    /// Decodes one frame, advancing the session context.
    fn decode_frame(&self, ctx: &mut SessionContext, frame: &[u8]) -> Result<Option<Vec<u8>>> {
        let hdr = PacketHeader::parse(frame)?;

        let computed = frame_checksum(frame);
        if computed != hdr.checksum {
            return Err(CoreError::BadChecksum {
                expected: hdr.checksum,
                computed,
            });
        }

        if !ctx.check_and_set_ack(hdr.seq) {
            if ctx.log_verbose() {
                debug!(peer = %ctx.peer(), seq = hdr.seq, "dropping repeated sequence");
            }
            return Ok(None);
        }
        ctx.ack = hdr.seq;
        ctx.recv_sig = hdr.checksum;

        let (plain, aes_key, recv_iv) =
            self.decrypt_session_body(ctx, &hdr, &frame[PACKET_HEADER_LEN..])?;
        ctx.install_session_key(aes_key, recv_iv, hdr.msgtype);
        Ok(Some(plain))
    }

    /// PKCS#7-pads and AES-CBC-encrypts a response body with the current
    /// session key and send IV.
    fn encrypt_body(&self, ctx: &SessionContext, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(CoreError::InvalidDataLen(0));
        }
        let aes_key = *ctx.aes_key()?;
        let padded = pkcs7_pad(data, AES_BLOCK_LEN)?;
        aes_cbc_encrypt(&aes_key, &ctx.send_iv, &padded)
    }

    /// Writes a full acknowledged response frame and advances the state.
    async fn write_response(
        &self,
        ctx: &mut SessionContext,
        w: &mut NetWriter<'_>,
        data: &[u8],
    ) -> Result<()> {
        ctx.seq = next_response_seq();
        let hdr = ctx.build_ack_header();
        let body = self.encrypt_body(ctx, data)?;

        let mut frame = BytesMut::with_capacity(
            LENGTH_PREFIX_LEN + PACKET_HEADER_LEN + ACK_FIELD_LEN + self.modulus_len + body.len(),
        );
        frame.put_u32_le(0);
        hdr.write_to(&mut frame);
        frame.put_u32_le(ctx.ack.wrapping_add(1));
        if ctx.state == state::HANDSHAKE_REPLY {
            let sig = rsa_util::sign_pkcs1v15_md5(&self.key, &body)?;
            frame.put_slice(&sig);
        }
        frame.put_slice(&body);

        let size = if ctx.stream {
            if ctx.state == state::HANDSHAKE_REPLY {
                return Err(CoreError::StreamNotAllowed);
            }
            if ctx.size < data.len() {
                return Err(CoreError::InvalidDataLen(ctx.size));
            }
            ctx.calc_stream_size(ctx.stream_block_len()) + PACKET_HEADER_LEN + ACK_FIELD_LEN
        } else {
            frame.len() - LENGTH_PREFIX_LEN
        };
        frame[..LENGTH_PREFIX_LEN].copy_from_slice(&(size as u32).to_le_bytes());

        let checksum = frame_checksum(&frame[LENGTH_PREFIX_LEN..]);
        frame[LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + 8].copy_from_slice(&checksum.to_le_bytes());
        ctx.send_sig = checksum;

        if ctx.log_verbose() {
            debug!(
                peer = %ctx.peer(),
                size,
                seq = hdr.seq,
                msgtype = hdr.msgtype,
                ack = ctx.ack.wrapping_add(1),
                "writing response frame"
            );
        }
        w.write_all(&frame).await?;
        ctx.advance_state();
        Ok(())
    }
}

#[async_trait]
impl TransCipher for Sz12Cipher {
    async fn encode_write(
        &self,
        ctx: &mut SessionContext,
        w: &mut NetWriter<'_>,
        data: &[u8],
    ) -> Result<()> {
        if ctx.state == state::HANDSHAKE_REPLY || ctx.state == state::STEADY {
            self.write_response(ctx, w, data).await
        } else {
            // Continuation write: raw encrypted chunk, no header. The send
            // IV is refreshed only if a decode re-armed it.
            ctx.update_send_iv();
            let chunk = self.encrypt_body(ctx, data)?;
            w.write_all(&chunk).await?;
            Ok(())
        }
    }

    async fn decode_read(
        &self,
        ctx: &mut SessionContext,
        r: &mut NetReader<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let frame = Self::read_frame(r).await?;
        if ctx.log_verbose() {
            debug!(peer = %ctx.peer(), len = frame.len(), "read frame");
        }
        self.decode_frame(ctx, &frame)
    }
}
