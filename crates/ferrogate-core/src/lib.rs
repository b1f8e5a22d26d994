// ============================================
// File: crates/ferrogate-core/src/lib.rs
// ============================================
//! # FerroGate Core — Protocol & Cryptography Library
//!
//! ## Creation Reason
//! Implements the framed cryptographic transport at the heart of FerroGate:
//! the wire protocol, the per-session crypto state machine, the transport
//! cipher variants, and the application payload decoders.
//!
//! ## Main Functionality
//!
//! ### Crypto Module ([`crypto`])
//! - Padding schemes (PKCS#7 and zero padding)
//! - AES-128 CBC/ECB block operations over pre-padded buffers
//! - RSA PKCS#1 v1.5 key transport and MD5 signatures
//!
//! ### Protocol Module ([`protocol`])
//! - 28-byte little-endian packet header and frame checksum
//! - `SessionContext`: per-peer keys, IV evolution, duplicate suppression
//!
//! ### Cipher Module ([`cipher`])
//! - `TransCipher` trait with the `sz12`, `nj11`, `cccfg` and `plain`
//!   variants selected from configuration
//!
//! ### Decode Module ([`decode`])
//! - `PayloadDecoder` trait turning decrypted bytes into `(api, payload)`
//!   via the `nj11`, `sz12`, `mt` and `web` envelopes
//!
//! ## Security Notes
//! - This is a bespoke legacy protocol preserved for wire compatibility;
//!   it is not a TLS replacement
//! - Session keys are zeroized when the session context is dropped
//!
//! ## ⚠️ Important Note for Next Developer
//! - All cryptographic code uses RustCrypto implementations
//! - Wire format is little-endian throughout; never change field order
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cipher;
pub mod crypto;
pub mod decode;
pub mod error;
pub mod protocol;

pub use api::{ApiHandler, NetConn};
pub use cipher::{new_trans_cipher, TransCipher};
pub use decode::{new_decoder, PayloadDecoder};
pub use error::{CoreError, Result};
pub use protocol::{PacketHeader, SessionContext};
