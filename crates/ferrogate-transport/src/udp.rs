// ============================================
// File: crates/ferrogate-transport/src/udp.rs
// ============================================
//! # UDP Socket and Datagram Peer
//!
//! ## Creation Reason
//! The server treats each received datagram as one request. `UdpPeer`
//! adapts a datagram into the byte-stream shape the connection wrapper
//! expects: reads drain the datagram bytes, writes send response datagrams
//! back to the peer address.
//!
//! ## Main Functionality
//! - `bind_udp`: socket2-configured bind (SO_REUSEADDR, non-blocking)
//! - `UdpPeer`: per-datagram `RawIo` adapter over the shared socket
//!
//! ## ⚠️ Important Note for Next Developer
//! - Each `poll_write` sends one datagram; the buffered writer above this
//!   coalesces a whole response into one write, so a response larger than
//!   the writer's buffer is split across datagrams
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::UdpSocket;
use tracing::info;

use crate::error::{Result, TransportError};

/// Largest request datagram the server reads.
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// Binds a UDP socket with address reuse enabled.
///
/// # Errors
/// - `AddressInUse` / `BindFailed` if the bind fails
pub fn bind_udp(addr: SocketAddr) -> Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| TransportError::io("creating udp socket", e))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| TransportError::io("setting non-blocking", e))?;
    socket.bind(&addr.into()).map_err(|e| {
        if e.kind() == io::ErrorKind::AddrInUse {
            TransportError::AddressInUse { addr }
        } else {
            TransportError::bind_failed(addr, e.to_string())
        }
    })?;

    let std_socket: std::net::UdpSocket = socket.into();
    let socket = UdpSocket::from_std(std_socket)
        .map_err(|e| TransportError::io("registering udp socket", e))?;
    if let Ok(local) = socket.local_addr() {
        info!("udp socket bound to {local}");
    }
    Ok(socket)
}

/// One received datagram presented as a bidirectional byte stream.
///
/// Reads return the datagram bytes then EOF; each write sends a datagram
/// to the originating peer over the shared listener socket.
pub struct UdpPeer {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    data: Vec<u8>,
    pos: usize,
}

impl UdpPeer {
    /// Wraps a received datagram.
    #[must_use]
    pub fn new(socket: Arc<UdpSocket>, peer: SocketAddr, data: Vec<u8>) -> Self {
        Self {
            socket,
            peer,
            data,
            pos: 0,
        }
    }

    /// The datagram's source address.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl AsyncRead for UdpPeer {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = &this.data[this.pos..];
        if remaining.is_empty() {
            // Datagram drained: EOF.
            return Poll::Ready(Ok(()));
        }
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for UdpPeer {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.socket.poll_send_to(cx, buf, this.peer)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl std::fmt::Debug for UdpPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpPeer")
            .field("peer", &self.peer)
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_bind_udp() {
        let socket = bind_udp(loopback()).unwrap();
        assert!(socket.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn test_peer_read_drains_datagram() {
        let socket = Arc::new(bind_udp(loopback()).unwrap());
        let mut peer = UdpPeer::new(socket, "127.0.0.1:9999".parse().unwrap(), b"abcdef".to_vec());

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"abcd");

        let mut rest = Vec::new();
        peer.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"ef");

        // Drained: subsequent reads see EOF.
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_peer_write_sends_datagram() {
        let listener = Arc::new(bind_udp(loopback()).unwrap());
        let receiver = bind_udp(loopback()).unwrap();
        let receiver_addr = receiver.local_addr().unwrap();

        let mut peer = UdpPeer::new(Arc::clone(&listener), receiver_addr, Vec::new());
        peer.write_all(b"response").await.unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"response");
        assert_eq!(from, listener.local_addr().unwrap());
    }
}
