// ============================================
// File: crates/ferrogate-transport/src/tcp.rs
// ============================================
//! # TCP Listener Wrapper
//!
//! ## Creation Reason
//! Thin bind/accept wrapper so the server loops deal with transport errors
//! instead of raw `io::Error`, and so bind-time failures surface with the
//! offending address attached.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use crate::error::{Result, TransportError};

/// Bound TCP listener handing out peer streams.
pub struct TcpAcceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpAcceptor {
    /// Binds to `ip:port`.
    ///
    /// # Errors
    /// - `InvalidAddress` if the address does not parse
    /// - `AddressInUse` / `BindFailed` if the bind fails
    pub async fn bind(ip: &str, port: u16) -> Result<Self> {
        let addr: SocketAddr = format!("{ip}:{port}")
            .parse()
            .map_err(|_| TransportError::InvalidAddress {
                addr: format!("{ip}:{port}"),
            })?;

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                TransportError::AddressInUse { addr }
            } else {
                TransportError::bind_failed(addr, e.to_string())
            }
        })?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;
        info!("tcp listener bound to {local_addr}");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accepts one connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        self.listener
            .accept()
            .await
            .map_err(|e| TransportError::AcceptFailed {
                reason: e.to_string(),
            })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl std::fmt::Debug for TcpAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpAcceptor")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}
