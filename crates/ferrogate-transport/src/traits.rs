// ============================================
// File: crates/ferrogate-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! The connection wrapper treats every peer — a TCP stream or a single UDP
//! datagram adapter — as one bidirectional byte stream. `RawIo` is that
//! object trait, with a blanket impl so any suitable stream qualifies.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must stay `Unpin`; the wrapper splits them into
//!   buffered halves with `tokio::io::split`

use tokio::io::{AsyncRead, AsyncWrite};

/// Bidirectional byte stream a connection is built over.
pub trait RawIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RawIo for T {}
