// ============================================
// File: crates/ferrogate-server/src/lib.rs
// ============================================
//! # FerroGate Server — Listener Orchestration
//!
//! ## Creation Reason
//! Ties the core protocol to real sockets: serve groups bind the
//! cross-product of configured net types, IPs and ports to one
//! (cipher, decoder, handler) triple and run a task per listener.
//!
//! ## Main Functionality
//! - [`config`]: `NetServeConfig` and the TOML group file
//! - [`sessions`]: UDP session map with idle expiry
//! - [`conn`]: per-request connection wrapper
//! - [`listener`]: TCP accept loop and UDP datagram loop
//! - [`group`]: `ServeGroup` and `listen_and_serve_groups`
//! - [`handlers`]: built-in demo handler
//!
//! ## Request Flow
//! ```text
//! listener ──► Conn::handle_request
//!                │ cipher.decode_read      (session lock held)
//!                │ decoder.decode
//!                │ handler.handle_api ──► conn.write ──► cipher.encode_write
//!                └ flush ──► close (TCP) / done (UDP)
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod conn;
pub mod error;
pub mod group;
pub mod handlers;
pub mod listener;
pub mod sessions;

pub use config::{NetServeConfig, ServeFileConfig};
pub use error::{Result, ServerError};
pub use group::{listen_and_serve_groups, ServeBundle, ServeGroup};
pub use sessions::SessionMap;
