// ============================================
// File: crates/ferrogate-core/src/crypto/mod.rs
// ============================================
//! # Cryptographic Primitives
//!
//! ## Main Functionality
//! - [`pad`]: PKCS#7 and zero padding
//! - [`block`]: AES-128 CBC/ECB over pre-padded buffers, MD5 helpers
//! - [`rsa`]: PKCS#1 v1.5 key transport and MD5 signatures
//!
//! ## ⚠️ Important Note for Next Developer
//! - Padding is applied by callers, never by the block layer; the wire
//!   format mixes PKCS#7 and zero padding between cipher variants

pub mod block;
pub mod pad;
pub mod rsa;

/// AES block size in bytes. Every cipher variant uses AES-128.
pub const AES_BLOCK_LEN: usize = 16;

/// AES-128 key size in bytes.
pub const AES_KEY_LEN: usize = 16;
