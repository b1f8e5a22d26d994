// ============================================
// File: crates/ferrogate-core/src/crypto/pad.rs
// ============================================
//! # Padding Schemes
//!
//! ## Creation Reason
//! The transport mixes two padding schemes: PKCS#7 for the session cipher
//! payloads and zero padding for the fixed-key line and datagram ciphers.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `zero_pad` leaves already-aligned input untouched, so it is NOT
//!   reversible without an out-of-band length; callers tolerate trailing
//!   zeros instead of unpadding

use std::borrow::Cow;

use crate::error::{CoreError, Result};

/// Appends PKCS#7 padding so the result length is a multiple of `blocklen`.
///
/// Always adds between 1 and `blocklen` bytes, each equal to the pad length.
pub fn pkcs7_pad(data: &[u8], blocklen: usize) -> Result<Vec<u8>> {
    if blocklen == 0 {
        return Err(CoreError::InvalidBlockLen(blocklen));
    }
    let padlen = blocklen - data.len() % blocklen;
    let mut out = Vec::with_capacity(data.len() + padlen);
    out.extend_from_slice(data);
    out.resize(data.len() + padlen, padlen as u8);
    Ok(out)
}

/// Strips PKCS#7 padding, verifying every padding byte.
///
/// Returns a sub-slice of the input without the padding.
pub fn pkcs7_unpad(data: &[u8], blocklen: usize) -> Result<&[u8]> {
    if blocklen == 0 {
        return Err(CoreError::InvalidBlockLen(blocklen));
    }
    if data.is_empty() || data.len() % blocklen != 0 {
        return Err(CoreError::InvalidDataLen(data.len()));
    }
    let padlen = data[data.len() - 1] as usize;
    if padlen == 0 || padlen > blocklen {
        return Err(CoreError::InvalidPadding);
    }
    let (body, pad) = data.split_at(data.len() - padlen);
    if pad.iter().any(|&b| b as usize != padlen) {
        return Err(CoreError::InvalidPadding);
    }
    Ok(body)
}

/// Appends zero bytes only when the length is not a multiple of `blocklen`.
///
/// Aligned input is returned unchanged (borrowed).
pub fn zero_pad(data: &[u8], blocklen: usize) -> Result<Cow<'_, [u8]>> {
    if blocklen == 0 {
        return Err(CoreError::InvalidBlockLen(blocklen));
    }
    let rem = data.len() % blocklen;
    if rem == 0 {
        return Ok(Cow::Borrowed(data));
    }
    let mut out = Vec::with_capacity(data.len() + blocklen - rem);
    out.extend_from_slice(data);
    out.resize(data.len() + blocklen - rem, 0);
    Ok(Cow::Owned(out))
}
