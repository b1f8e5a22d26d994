// ============================================
// File: crates/ferrogate-core/src/crypto/block.rs
// ============================================
//! # AES Block Operations
//!
//! ## Creation Reason
//! Wraps the RustCrypto AES-128 CBC and ECB modes behind functions that
//! operate on pre-padded buffers, plus the MD5 digest helper the protocol
//! uses for checksums and IV derivation.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Inputs must already be padded to 16 bytes; these functions reject
//!   unaligned or empty buffers instead of padding
//! - MD5 here is a legacy wire-format requirement, not a security choice

use aes::cipher::{
    block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit,
};
use aes::Aes128;
use md5::{Digest, Md5};

use crate::crypto::AES_BLOCK_LEN;
use crate::error::{CoreError, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;

fn check_aligned(data: &[u8]) -> Result<()> {
    if data.is_empty() || data.len() % AES_BLOCK_LEN != 0 {
        return Err(CoreError::InvalidDataLen(data.len()));
    }
    Ok(())
}

/// Encrypts a pre-padded buffer with AES-128-CBC.
pub fn aes_cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    check_aligned(data)?;
    Ok(Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<NoPadding>(data))
}

/// Decrypts an AES-128-CBC buffer without removing padding.
pub fn aes_cbc_decrypt(key: &[u8; 16], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    check_aligned(data)?;
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| CoreError::InvalidDataLen(data.len()))
}

/// Encrypts a pre-padded buffer with AES-128-ECB.
pub fn aes_ecb_encrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    check_aligned(data)?;
    Ok(Aes128EcbEnc::new(key.into()).encrypt_padded_vec_mut::<NoPadding>(data))
}

/// Decrypts an AES-128-ECB buffer without removing padding.
pub fn aes_ecb_decrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    check_aligned(data)?;
    Aes128EcbDec::new(key.into())
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| CoreError::InvalidDataLen(data.len()))
}

/// MD5 over the concatenation of `parts`.
#[must_use]
pub fn md5_concat(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::pad::{pkcs7_pad, pkcs7_unpad, zero_pad};

    const KEY: [u8; 16] = [0x42; 16];
    const IV: [u8; 16] = [0x17; 16];

    #[test]
    fn test_cbc_roundtrip() {
        let plain = pkcs7_pad(b"the quick brown fox", AES_BLOCK_LEN).unwrap();
        let ct = aes_cbc_encrypt(&KEY, &IV, &plain).unwrap();
        assert_ne!(ct, plain);
        let pt = aes_cbc_decrypt(&KEY, &IV, &ct).unwrap();
        assert_eq!(pkcs7_unpad(&pt, AES_BLOCK_LEN).unwrap(), b"the quick brown fox");
    }

    #[test]
    fn test_cbc_iv_changes_ciphertext() {
        let plain = [0u8; 32];
        let ct1 = aes_cbc_encrypt(&KEY, &IV, &plain).unwrap();
        let ct2 = aes_cbc_encrypt(&KEY, &[0x18; 16], &plain).unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_ecb_roundtrip() {
        let plain = zero_pad(b"config blob", AES_BLOCK_LEN).unwrap();
        let ct = aes_ecb_encrypt(&KEY, &plain).unwrap();
        let pt = aes_ecb_decrypt(&KEY, &ct).unwrap();
        assert_eq!(&pt[..11], b"config blob");
        assert!(pt[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_ecb_identical_blocks_encrypt_identically() {
        let plain = [0x55u8; 32];
        let ct = aes_ecb_encrypt(&KEY, &plain).unwrap();
        assert_eq!(ct[..16], ct[16..]);
    }

    #[test]
    fn test_unaligned_input_rejected() {
        assert!(matches!(
            aes_cbc_encrypt(&KEY, &IV, &[1, 2, 3]),
            Err(CoreError::InvalidDataLen(3))
        ));
        assert!(matches!(
            aes_cbc_decrypt(&KEY, &IV, &[]),
            Err(CoreError::InvalidDataLen(0))
        ));
        assert!(matches!(
            aes_ecb_encrypt(&KEY, &[0u8; 17]),
            Err(CoreError::InvalidDataLen(17))
        ));
    }

    #[test]
    fn test_md5_concat_matches_single_buffer() {
        let whole = md5_concat(&[b"hello world"]);
        let split = md5_concat(&[b"hello", b" ", b"world"]);
        assert_eq!(whole, split);
    }

    #[test]
    fn test_md5_known_vector() {
        // MD5("abc") = 900150983cd24fb0d6963f7d28e17f72
        let digest = md5_concat(&[b"abc"]);
        assert_eq!(
            hex::encode(digest),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }
}
