// ============================================
// File: crates/ferrogate-core/src/api.rs
// ============================================
//! # Application Handler Contract
//!
//! ## Creation Reason
//! Defines the seam between the transport core and the application: the
//! connection surface a handler writes through, and the handler interface
//! the server dispatches decoded requests to.
//!
//! ## Dispatch Flow
//! ```text
//! cipher.decode_read ──► decoder.decode ──► handler.handle_api(conn, api, data)
//!                                                  │
//!                conn.write ◄── cipher.encode_write┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Handlers run one request per connection task; blocking work should be
//!   offloaded, the core makes no concurrency guarantees downstream
//!
//! ## Last Modified
//! v0.1.0 - Initial contracts

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Connection surface exposed to an [`ApiHandler`].
///
/// Writes funnel through the listener's transport cipher; `begin_stream`
/// switches the pending response into stream mode before the first write.
#[async_trait]
pub trait NetConn: Send {
    /// Encrypts and writes response bytes. Empty writes are ignored.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Declares a streamed response of `total` payload bytes delivered in
    /// chunks of at most `packsize` bytes.
    fn begin_stream(&mut self, total: usize, packsize: usize);

    /// Address of the requesting peer.
    fn peer_addr(&self) -> SocketAddr;
}

/// Application handler invoked for every successfully decoded request.
#[async_trait]
pub trait ApiHandler: Send + Sync {
    /// Handles one decoded request and writes any response through `conn`.
    async fn handle_api(&self, conn: &mut dyn NetConn, api: i32, data: &[u8]) -> Result<()>;

    /// Maps a protocol API name (string envelopes) to a handler code.
    fn sapi_to_code(&self, api: &str) -> i32;

    /// Maps a protocol API number (binary envelope) to a handler code.
    fn api_to_code(&self, api: i32) -> i32;

    /// Returns the shared secret for `app`, used by the signed web
    /// envelope. Unknown apps yield an empty secret.
    fn query_app_secret_key(&self, app: &str) -> String;
}

/// Resolves a configured handler name to an implementation.
pub type HandlerResolver = dyn Fn(&str) -> Option<Arc<dyn ApiHandler>> + Send + Sync;
