// ============================================
// File: crates/ferrogate-server/src/listener.rs
// ============================================
//! # Server Loops
//!
//! ## Creation Reason
//! One task per listener: the TCP loop accepts forever and spawns a worker
//! per connection; the UDP loop reads datagrams and spawns a worker per
//! datagram, with the session context looked up by peer address.
//!
//! ## Shutdown
//! Loops observe the shutdown broadcast at accept/read boundaries and the
//! terminate flag after each accepted item; in-flight workers finish.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Accept/receive errors are logged and the loop continues; only
//!   bind-time errors (in the serve group) are fatal
//! - Read deadline expiry on an idle UDP socket is normal and silent
//!
//! ## Last Modified
//! v0.1.0 - Initial server loops

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error};

use ferrogate_core::SessionContext;
use ferrogate_transport::{TcpAcceptor, UdpPeer, MAX_DATAGRAM_LEN};

use crate::conn::Conn;
use crate::group::ServeBundle;
use crate::sessions::SessionMap;

/// Spawns the accept loop for one TCP listener.
pub(crate) fn spawn_tcp_listener(
    acceptor: TcpAcceptor,
    bundle: Arc<ServeBundle>,
    terminate: Arc<AtomicBool>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(addr = %acceptor.local_addr(), "tcp serve loop started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = acceptor.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let ctx = Arc::new(Mutex::new(SessionContext::new(peer)));
                            let conn = Conn::new(
                                Box::new(stream),
                                peer,
                                ctx,
                                Arc::clone(&bundle),
                                true,
                            );
                            tokio::spawn(conn.handle_request());
                        }
                        Err(e) => error!(error = %e, "accept failed"),
                    }
                    if terminate.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }
        debug!(addr = %acceptor.local_addr(), "tcp serve loop exiting");
    })
}

enum Datagram {
    Data(usize, SocketAddr),
    Empty(SocketAddr),
    DeadlinePassed,
    Failed(io::Error),
}

async fn next_datagram(
    socket: &UdpSocket,
    buf: &mut [u8],
    deadline: Option<Duration>,
) -> Datagram {
    let received = match deadline {
        Some(t) => match timeout(t, socket.recv_from(buf)).await {
            Ok(received) => received,
            Err(_) => return Datagram::DeadlinePassed,
        },
        None => socket.recv_from(buf).await,
    };
    match received {
        Ok((0, peer)) => Datagram::Empty(peer),
        Ok((n, peer)) => Datagram::Data(n, peer),
        Err(e) => Datagram::Failed(e),
    }
}

/// Spawns the datagram loop for one UDP socket.
pub(crate) fn spawn_udp_listener(
    socket: Arc<UdpSocket>,
    sessions: Arc<SessionMap>,
    bundle: Arc<ServeBundle>,
    terminate: Arc<AtomicBool>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = bundle.config.read_timeout();
        let verbose = bundle.config.log_verbose;
        debug!("udp serve loop started");
        loop {
            let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
            tokio::select! {
                _ = shutdown.recv() => break,
                datagram = next_datagram(&socket, &mut buf, deadline) => {
                    match datagram {
                        Datagram::Data(n, peer) => {
                            if verbose {
                                debug!(%peer, len = n, "received udp datagram");
                            }
                            buf.truncate(n);
                            let ctx = sessions.get_or_create(peer);
                            let io = UdpPeer::new(Arc::clone(&socket), peer, buf);
                            let conn = Conn::new(
                                Box::new(io),
                                peer,
                                ctx,
                                Arc::clone(&bundle),
                                false,
                            );
                            tokio::spawn(conn.handle_request());
                        }
                        Datagram::Empty(peer) => error!(%peer, "read zero-length udp datagram"),
                        Datagram::DeadlinePassed => {}
                        Datagram::Failed(e) => error!(error = %e, "udp receive failed"),
                    }
                    if terminate.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }
        debug!("udp serve loop exiting");
    })
}
