// ============================================
// File: crates/ferrogate-core/src/cipher/mod.rs
// ============================================
//! # Transport Ciphers
//!
//! ## Creation Reason
//! The transport accepts several on-the-wire encryption framings; each is a
//! [`TransCipher`] selected from the listener configuration.
//!
//! ## Variants
//! | name    | framing                        | crypto                       |
//! |---------|--------------------------------|------------------------------|
//! | `sz12`  | length-prefixed binary frames  | RSA key transport + AES-CBC  |
//! | `nj11`  | CRLF-terminated base64 lines   | fixed-key AES-CBC, zero pad  |
//! | `cccfg` | single base64 datagram         | fixed-key AES-ECB, zero pad  |
//! | `plain` | raw bytes                      | none                         |
//!
//! Only `sz12` is stateful: it carries the handshake and evolves the
//! session context. The others are stateless symmetric layers.
//!
//! ## Configuration
//! A cipher is configured as a string tuple; the first element selects the
//! variant, the rest are variant-specific:
//! `nj11 → (aes_key_b64, aes_iv_b64)`, `sz12 → (rsa_private_key_b64)`,
//! `cccfg → (aes_key_b64)`, `plain → ()`.
//!
//! ## Last Modified
//! v0.1.0 - Initial cipher variants

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::io::{AsyncBufRead, AsyncWrite};

use ferrogate_common::CommonError;

use crate::error::{CoreError, Result};
use crate::protocol::SessionContext;

pub mod cccfg;
pub mod nj11;
pub mod plain;
pub mod sz12;

pub use cccfg::CccfgCipher;
pub use nj11::Nj11Cipher;
pub use plain::PlainCipher;
pub use sz12::Sz12Cipher;

/// Buffered byte source a cipher decodes one message from.
pub type NetReader<'a> = dyn AsyncBufRead + Send + Unpin + 'a;

/// Byte sink a cipher encodes one message into.
pub type NetWriter<'a> = dyn AsyncWrite + Send + Unpin + 'a;

/// One on-the-wire encryption framing.
///
/// `decode_read` consumes exactly one message and returns its decrypted
/// bytes, or `None` when the message was consumed but must not be processed
/// (duplicate sequence, empty input). `encode_write` encrypts and frames one
/// response; flushing is the caller's concern.
#[async_trait]
pub trait TransCipher: Send + Sync + std::fmt::Debug {
    /// Encrypts and writes one message.
    async fn encode_write(
        &self,
        ctx: &mut SessionContext,
        w: &mut NetWriter<'_>,
        data: &[u8],
    ) -> Result<()>;

    /// Reads and decrypts one message.
    async fn decode_read(
        &self,
        ctx: &mut SessionContext,
        r: &mut NetReader<'_>,
    ) -> Result<Option<Vec<u8>>>;
}

fn require_args(spec: &[String], count: usize) -> Result<()> {
    if spec.len() < count {
        return Err(CommonError::invalid_input(
            "cipher",
            format!("spec '{}' needs {} elements", spec.join(" "), count),
        )
        .into());
    }
    Ok(())
}

pub(crate) fn decode_key16(field: &str, b64: &str) -> Result<[u8; 16]> {
    let raw = BASE64
        .decode(b64)
        .map_err(|e| CommonError::invalid_input(field, format!("not valid base64: {e}")))?;
    let len = raw.len();
    raw.try_into()
        .map_err(|_| CommonError::invalid_length(16, len).into())
}

/// Builds a transport cipher from its configuration tuple.
pub fn new_trans_cipher(spec: &[String]) -> Result<Box<dyn TransCipher>> {
    require_args(spec, 1)?;
    match spec[0].as_str() {
        "nj11" => {
            require_args(spec, 3)?;
            Ok(Box::new(Nj11Cipher::from_base64(&spec[1], &spec[2])?))
        }
        "sz12" => {
            require_args(spec, 2)?;
            Ok(Box::new(Sz12Cipher::from_base64(&spec[1])?))
        }
        "cccfg" => {
            require_args(spec, 2)?;
            Ok(Box::new(CccfgCipher::from_base64(&spec[1])?))
        }
        "plain" => Ok(Box::new(PlainCipher)),
        other => Err(CoreError::UnsupportedVariant(other.to_string())),
    }
}
