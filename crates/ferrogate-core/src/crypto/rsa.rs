// ============================================
// File: crates/ferrogate-core/src/crypto/rsa.rs
// ============================================
//! # RSA Key Transport and Signatures
//!
//! ## Creation Reason
//! The session cipher negotiates per-session AES keys by RSA PKCS#1 v1.5
//! key transport, and authenticates handshake responses with PKCS#1
//! v1.5/MD5 signatures. Keys are configured as base64 PKCS#1 DER.
//!
//! ## ⚠️ Important Note for Next Developer
//! - 1024-bit keys are what deployed peers use; accept what parses
//! - Signature digest is MD5 by wire contract, do not "upgrade" it

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use md5::{Digest, Md5};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::error::{CoreError, Result};

/// Parses a base64-encoded PKCS#1 DER private key.
pub fn parse_private_key_b64(b64: &str) -> Result<RsaPrivateKey> {
    let der = BASE64
        .decode(b64.trim())
        .map_err(|e| CoreError::rsa_failure(format!("key is not valid base64: {e}")))?;
    parse_private_key_der(&der)
}

/// Parses a PKCS#1 DER private key.
pub fn parse_private_key_der(der: &[u8]) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| CoreError::rsa_failure(format!("key is not valid PKCS#1 DER: {e}")))
}

/// Modulus length in whole bytes; the size of one RSA block on the wire.
#[must_use]
pub fn modulus_len(key: &RsaPrivateKey) -> usize {
    key.size()
}

/// RSA PKCS#1 v1.5 decryption of a single block.
pub fn decrypt_pkcs1v15(key: &RsaPrivateKey, block: &[u8]) -> Result<Vec<u8>> {
    key.decrypt(Pkcs1v15Encrypt, block)
        .map_err(|e| CoreError::rsa_failure(format!("decrypt: {e}")))
}

/// Signs `data` with PKCS#1 v1.5 over its MD5 digest.
pub fn sign_pkcs1v15_md5(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    let digest = Md5::digest(data);
    key.sign(Pkcs1v15Sign::new::<Md5>(), &digest)
        .map_err(|e| CoreError::rsa_failure(format!("sign: {e}")))
}

/// Verifies a PKCS#1 v1.5/MD5 signature over `data`.
pub fn verify_pkcs1v15_md5(key: &RsaPublicKey, data: &[u8], sig: &[u8]) -> Result<()> {
    let digest = Md5::digest(data);
    key.verify(Pkcs1v15Sign::new::<Md5>(), &digest, sig)
        .map_err(|e| CoreError::rsa_failure(format!("verify: {e}")))
}
