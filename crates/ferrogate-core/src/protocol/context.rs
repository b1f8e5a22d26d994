// ============================================
// File: crates/ferrogate-core/src/protocol/context.rs
// ============================================
//! # Session Context
//!
//! ## Creation Reason
//! Holds the per-peer protocol state: the negotiated AES key, the receive
//! and send IVs, the ACK window for duplicate suppression, the handshake
//! state counter and the streaming parameters.
//!
//! ## Session Lifecycle
//! ```text
//! TCP: created at accept ──► destroyed when the connection closes
//! UDP: created on first datagram ──► expires after 5 minutes idle
//! ```
//!
//! ## State Counter
//! `state` starts at 0, becomes 2 after a handshake request is decoded and
//! 10 after a steady-state request. Each emitted response increments it, so
//! the first response takes the handshake-ack path and later writes the
//! raw-chunk path.
//!
//! ## IV Evolution
//! `send_iv = MD5(recv_iv || nonce_le || seq_le || recv_sig_le)`, computed
//! lazily when `update_iv` is armed by a decode and consumed by the next
//! emit.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Duplicate detection compares against the pre-mutation `ack`; callers
//!   must take `check_and_set_ack`'s verdict before touching other state
//! - The response sequence counter is process-global; tests rely on
//!   uniqueness across all sessions
//!
//! ## Last Modified
//! v0.1.0 - Initial session state

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use tracing::debug;
use zeroize::Zeroize;

use ferrogate_common::unix_now;

use crate::crypto::block::md5_concat;
use crate::crypto::{AES_BLOCK_LEN, AES_KEY_LEN};
use crate::error::{CoreError, Result};
use crate::protocol::header::{msgtype, PacketHeader, VERSION_CURRENT};

/// Session state counter values.
pub mod state {
    /// Fresh session, nothing decoded yet.
    pub const INITIAL: u8 = 0;
    /// A handshake request was decoded; the next emit completes it.
    pub const HANDSHAKE_REPLY: u8 = 2;
    /// A steady-state request was decoded.
    pub const STEADY: u8 = 10;
}

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

// ============================================
// Global response sequence counter
// ============================================

fn response_seq() -> &'static AtomicU32 {
    static SEQ: OnceLock<AtomicU32> = OnceLock::new();
    SEQ.get_or_init(|| AtomicU32::new(rand::random()))
}

/// Returns the next process-wide response sequence number.
///
/// Shared across all sessions and listeners; randomly seeded at first use
/// and wrapping at `u32::MAX`.
#[must_use]
pub fn next_response_seq() -> u32 {
    response_seq().fetch_add(1, Ordering::SeqCst).wrapping_add(1)
}

/// Rounds `size` up to the next multiple of `bound`.
#[must_use]
pub(crate) const fn round_up(size: usize, bound: usize) -> usize {
    ((size + bound - 1) / bound) * bound
}

// ============================================
// SessionContext
// ============================================

/// Per-peer protocol state, keyed by connection (TCP) or peer address (UDP).
pub struct SessionContext {
    peer: SocketAddr,
    log_verbose: bool,

    pub(crate) aes_key: Option<[u8; AES_KEY_LEN]>,
    pub(crate) recv_iv: [u8; IV_LEN],
    pub(crate) send_iv: [u8; IV_LEN],
    pub(crate) recv_sig: u64,
    pub(crate) send_sig: u64,

    pub(crate) seq: u32,
    pub(crate) ack: u32,
    pub(crate) state: u8,
    pub(crate) nonce: u64,
    pub(crate) update_iv: bool,

    pub(crate) stream: bool,
    pub(crate) size: usize,
    pub(crate) packsize: usize,
}

impl SessionContext {
    /// Creates a fresh context for `peer`.
    #[must_use]
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            log_verbose: false,
            aes_key: None,
            recv_iv: [0; IV_LEN],
            send_iv: [0; IV_LEN],
            recv_sig: 0,
            send_sig: 0,
            seq: 0,
            ack: 0,
            state: state::INITIAL,
            nonce: 0,
            update_iv: false,
            stream: false,
            size: 0,
            packsize: 0,
        }
    }

    /// Peer address this context belongs to.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Enables or disables per-message verbose logging.
    pub fn set_log_verbose(&mut self, verbose: bool) {
        self.log_verbose = verbose;
    }

    /// Whether verbose logging is enabled for this session.
    #[must_use]
    pub const fn log_verbose(&self) -> bool {
        self.log_verbose
    }

    /// Last acknowledged request sequence number.
    #[must_use]
    pub const fn ack(&self) -> u32 {
        self.ack
    }

    /// Current state counter value.
    #[must_use]
    pub const fn state(&self) -> u8 {
        self.state
    }

    /// Records `seq` as the new ACK and reports whether it is fresh.
    ///
    /// A request whose sequence equals the previously recorded ACK (and the
    /// ACK is set) is a duplicate: the verdict is `false` and the caller
    /// must drop the message. The ACK field itself is always updated, which
    /// matches the pre-mutation comparison the protocol depends on.
    pub fn check_and_set_ack(&mut self, seq: u32) -> bool {
        if self.log_verbose {
            debug!(peer = %self.peer, seq, prev = self.ack, "recording request ack");
        }
        let fresh = self.ack == 0 || self.ack != seq;
        self.ack = seq;
        fresh
    }

    /// Stores the negotiated session key and receive IV after a successful
    /// decode, arming the send-IV recomputation.
    pub(crate) fn install_session_key(
        &mut self,
        key: [u8; AES_KEY_LEN],
        recv_iv: [u8; IV_LEN],
        request_msgtype: u32,
    ) {
        self.aes_key = Some(key);
        self.recv_iv = recv_iv;
        self.update_iv = true;
        self.state = if request_msgtype == msgtype::HANDSHAKE_REQUEST {
            state::HANDSHAKE_REPLY
        } else {
            state::STEADY
        };
    }

    /// Returns the negotiated AES key.
    pub(crate) fn aes_key(&self) -> Result<&[u8; AES_KEY_LEN]> {
        self.aes_key.as_ref().ok_or(CoreError::MissingSessionKey)
    }

    /// Builds the header for the response about to be emitted.
    ///
    /// Chooses the message type from the state counter and stream flag,
    /// stamps the current Unix time as the nonce and refreshes the send IV.
    pub(crate) fn build_ack_header(&mut self) -> PacketHeader {
        let msgtype = if self.state == state::HANDSHAKE_REPLY {
            msgtype::HANDSHAKE_ACK
        } else if self.stream {
            msgtype::STREAM
        } else {
            msgtype::ACK
        };
        self.nonce = unix_now();
        let hdr = PacketHeader {
            checksum: 0,
            msgtype,
            version: VERSION_CURRENT,
            seq: self.seq,
            nonce: self.nonce,
        };
        self.update_send_iv();
        hdr
    }

    /// Recomputes the send IV if a decode armed `update_iv`.
    ///
    /// `send_iv = MD5(recv_iv || nonce_le || seq_le || recv_sig_le)`
    pub(crate) fn update_send_iv(&mut self) {
        if !self.update_iv {
            return;
        }
        if self.log_verbose {
            debug!(
                peer = %self.peer,
                nonce = self.nonce,
                seq = self.seq,
                recv_sig = self.recv_sig,
                "deriving send iv"
            );
        }
        self.send_iv = md5_concat(&[
            &self.recv_iv,
            &self.nonce.to_le_bytes(),
            &self.seq.to_le_bytes(),
            &self.recv_sig.to_le_bytes(),
        ]);
        self.update_iv = false;
    }

    /// Advances the state counter after a response has been emitted.
    pub(crate) fn advance_state(&mut self) {
        self.state = self.state.wrapping_add(1);
    }

    // ========================================
    // Streaming
    // ========================================

    /// Declares that the response will be streamed: `size` total payload
    /// bytes delivered in chunks of at most `packsize` bytes.
    pub fn begin_stream(&mut self, size: usize, packsize: usize) {
        self.stream = true;
        self.size = size;
        self.packsize = packsize;
    }

    /// Whether stream mode is active.
    #[must_use]
    pub const fn stream(&self) -> bool {
        self.stream
    }

    /// Declared total stream payload size.
    #[must_use]
    pub const fn stream_size(&self) -> usize {
        self.size
    }

    /// For a stream with `n` payload bytes already consumed, returns the
    /// next chunk's payload size and its on-wire (padded) size.
    ///
    /// A chunk already aligned to the block size still grows by one block,
    /// mirroring PKCS#7's full-block padding.
    #[must_use]
    pub(crate) fn pack_size(&self, n: usize, block_size: usize) -> (usize, usize) {
        let datasize = (self.size - n).min(self.packsize);
        let mut pksize = round_up(datasize, block_size);
        if pksize == datasize {
            pksize += block_size;
        }
        (datasize, pksize)
    }

    /// Total on-wire size of the stream body across all chunks.
    #[must_use]
    pub(crate) fn calc_stream_size(&self, block_size: usize) -> usize {
        let mut n = 0;
        let mut size = 0;
        while n < self.size {
            let (datasize, packsize) = self.pack_size(n, block_size);
            size += packsize;
            n += datasize;
        }
        size
    }

    /// Block size used for stream sizing.
    #[must_use]
    pub(crate) const fn stream_block_len(&self) -> usize {
        AES_BLOCK_LEN
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.aes_key.zeroize();
        self.recv_iv.zeroize();
        self.send_iv.zeroize();
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("seq", &self.seq)
            .field("ack", &self.ack)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_ctx() -> SessionContext {
        SessionContext::new("127.0.0.1:9000".parse().unwrap())
    }

    #[test]
    fn test_duplicate_detection() {
        let mut ctx = test_ctx();

        // Unset ACK accepts anything, including a repeat of 0-adjacent seqs.
        assert!(ctx.check_and_set_ack(5));
        assert_eq!(ctx.ack(), 5);

        // Same seq again is a duplicate.
        assert!(!ctx.check_and_set_ack(5));
        assert_eq!(ctx.ack(), 5);

        // A different seq is fresh.
        assert!(ctx.check_and_set_ack(6));
        assert!(ctx.check_and_set_ack(5));
    }

    #[test]
    fn test_duplicate_of_zero_ack_accepted() {
        let mut ctx = test_ctx();
        assert!(ctx.check_and_set_ack(3));
        // Seq 0 resets the window: 0 is treated as "unset".
        assert!(ctx.check_and_set_ack(0));
        assert!(ctx.check_and_set_ack(0));
    }

    #[test]
    fn test_install_session_key_state_transitions() {
        let mut ctx = test_ctx();
        ctx.install_session_key([1; 16], [2; 16], msgtype::HANDSHAKE_REQUEST);
        assert_eq!(ctx.state(), state::HANDSHAKE_REPLY);
        assert!(ctx.update_iv);
        assert_eq!(ctx.aes_key().unwrap(), &[1; 16]);

        ctx.install_session_key([3; 16], [4; 16], msgtype::ACK);
        assert_eq!(ctx.state(), state::STEADY);
    }

    #[test]
    fn test_missing_session_key() {
        let ctx = test_ctx();
        assert!(matches!(ctx.aes_key(), Err(CoreError::MissingSessionKey)));
    }

    #[test]
    fn test_send_iv_evolution() {
        let mut ctx = test_ctx();
        ctx.recv_iv = [0xab; 16];
        ctx.nonce = 0x0102_0304_0506_0708;
        ctx.seq = 42;
        ctx.recv_sig = 0x1111_2222_3333_4444;
        ctx.update_iv = true;

        ctx.update_send_iv();
        let expected = md5_concat(&[
            &[0xab; 16],
            &0x0102_0304_0506_0708u64.to_le_bytes(),
            &42u32.to_le_bytes(),
            &0x1111_2222_3333_4444u64.to_le_bytes(),
        ]);
        assert_eq!(ctx.send_iv, expected);
        assert!(!ctx.update_iv);

        // Not re-armed: further calls leave the IV alone even if inputs move.
        ctx.seq = 43;
        ctx.update_send_iv();
        assert_eq!(ctx.send_iv, expected);
    }

    #[test]
    fn test_build_ack_header_msgtype_selection() {
        let mut ctx = test_ctx();
        ctx.seq = 9;

        ctx.state = state::HANDSHAKE_REPLY;
        assert_eq!(ctx.build_ack_header().msgtype, msgtype::HANDSHAKE_ACK);

        ctx.state = state::STEADY;
        assert_eq!(ctx.build_ack_header().msgtype, msgtype::ACK);

        ctx.begin_stream(100, 48);
        assert_eq!(ctx.build_ack_header().msgtype, msgtype::STREAM);
    }

    #[test]
    fn test_build_ack_header_stamps_nonce_and_seq() {
        let mut ctx = test_ctx();
        ctx.seq = 77;
        let hdr = ctx.build_ack_header();
        assert_eq!(hdr.seq, 77);
        assert_eq!(hdr.version, VERSION_CURRENT);
        assert_eq!(hdr.nonce, ctx.nonce);
        assert!(hdr.nonce > 1_704_067_200);
    }

    #[test]
    fn test_pack_size() {
        let mut ctx = test_ctx();
        ctx.begin_stream(100, 48);

        // Full chunk, aligned, grows by one block.
        assert_eq!(ctx.pack_size(0, 16), (48, 64));
        assert_eq!(ctx.pack_size(48, 16), (48, 64));
        // Tail chunk of 4 bytes rounds up to one block.
        assert_eq!(ctx.pack_size(96, 16), (4, 16));
    }

    #[test]
    fn test_calc_stream_size() {
        let mut ctx = test_ctx();
        ctx.begin_stream(100, 48);
        // 64 + 64 + 16
        assert_eq!(ctx.calc_stream_size(16), 144);

        ctx.begin_stream(48, 48);
        assert_eq!(ctx.calc_stream_size(16), 64);

        ctx.begin_stream(1, 48);
        assert_eq!(ctx.calc_stream_size(16), 16);
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 16), 0);
        assert_eq!(round_up(1, 16), 16);
        assert_eq!(round_up(16, 16), 16);
        assert_eq!(round_up(17, 16), 32);
    }

    #[test]
    fn test_response_seq_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| next_response_seq()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for seq in h.join().unwrap() {
                assert!(seen.insert(seq), "duplicate response seq {seq}");
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
