// ============================================
// File: crates/ferrogate-server/src/group.rs
// ============================================
//! # Serve Groups
//!
//! ## Creation Reason
//! A serve group binds one (cipher, decoder, handler) triple to the
//! cross-product of configured net types × listen IPs × ports and runs a
//! listener task for each binding.
//!
//! ## Ownership
//! The group owns its listener tasks and the shared [`ServeBundle`];
//! connections borrow the bundle through an `Arc`, so nothing cyclic is
//! ever constructed.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Bind errors are fatal: `serve` fails instead of limping along with a
//!   partial cross-product
//! - `stop` flips the terminate flag and broadcasts shutdown; loops exit
//!   at their next boundary and in-flight requests finish
//!
//! ## Last Modified
//! v0.1.0 - Initial serve groups

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ferrogate_core::{new_decoder, new_trans_cipher, ApiHandler, PayloadDecoder, TransCipher};
use ferrogate_core::api::HandlerResolver;
use ferrogate_transport::{bind_udp, TcpAcceptor, TransportError};

use crate::config::NetServeConfig;
use crate::error::{Result, ServerError};
use crate::listener::{spawn_tcp_listener, spawn_udp_listener};
use crate::sessions::{spawn_sweeper, SessionMap, SESSION_IDLE_TTL, SESSION_SWEEP_INTERVAL};

/// Immutable per-group state shared by every connection: the configured
/// cipher, decoder, handler and the group configuration.
pub struct ServeBundle {
    /// Group configuration.
    pub config: NetServeConfig,
    /// Transport cipher for every listener in the group.
    pub cipher: Box<dyn TransCipher>,
    /// Payload decoder for every listener in the group.
    pub decoder: Box<dyn PayloadDecoder>,
    /// Application handler requests are dispatched to.
    pub handler: Arc<dyn ApiHandler>,
}

impl ServeBundle {
    /// Materializes the cipher and decoder for a group configuration.
    pub fn new(config: NetServeConfig, handler: Arc<dyn ApiHandler>) -> Result<Self> {
        let cipher = new_trans_cipher(&config.cipher)?;
        let decoder = new_decoder(&config.code_type, Arc::clone(&handler))?;
        Ok(Self {
            config,
            cipher,
            decoder,
            handler,
        })
    }
}

/// One listener group: bound sockets, their tasks, and shutdown state.
pub struct ServeGroup {
    bundle: Arc<ServeBundle>,
    sessions: Arc<SessionMap>,
    terminate: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    bound: Mutex<Vec<(String, SocketAddr)>>,
}

impl ServeGroup {
    /// Validates the configuration and builds the group's bundle.
    pub fn new(config: NetServeConfig, handler: Arc<dyn ApiHandler>) -> Result<Self> {
        config.validate()?;
        let bundle = Arc::new(ServeBundle::new(config, handler)?);
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            bundle,
            sessions: Arc::new(SessionMap::new(SESSION_IDLE_TTL)),
            terminate: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            bound: Mutex::new(Vec::new()),
        })
    }

    /// Binds every (net type × IP × port) combination and spawns its
    /// listener task. Bind failures abort with the failing address.
    pub async fn serve(&self) -> Result<()> {
        self.terminate.store(false, Ordering::SeqCst);
        let config = self.bundle.config.clone();
        let mut sweeper_running = false;

        for net_type in &config.net_type {
            for ip in &config.listen_ip {
                for &port in &config.port {
                    info!(
                        net_type = %net_type,
                        ip = %ip,
                        port,
                        cipher = %config.cipher[0],
                        code_type = %config.code_type,
                        "starting listener"
                    );
                    if net_type.contains("tcp") {
                        let acceptor = TcpAcceptor::bind(ip, port).await?;
                        self.bound
                            .lock()
                            .push((net_type.clone(), acceptor.local_addr()));
                        self.tasks.lock().push(spawn_tcp_listener(
                            acceptor,
                            Arc::clone(&self.bundle),
                            Arc::clone(&self.terminate),
                            self.shutdown_tx.subscribe(),
                        ));
                    } else {
                        let addr: SocketAddr = format!("{ip}:{port}").parse().map_err(|_| {
                            TransportError::InvalidAddress {
                                addr: format!("{ip}:{port}"),
                            }
                        })?;
                        let socket = Arc::new(bind_udp(addr)?);
                        let local = socket
                            .local_addr()
                            .map_err(|e| TransportError::io("getting local address", e))?;
                        self.bound.lock().push((net_type.clone(), local));

                        if !sweeper_running {
                            self.tasks.lock().push(spawn_sweeper(
                                Arc::clone(&self.sessions),
                                SESSION_SWEEP_INTERVAL,
                                self.shutdown_tx.subscribe(),
                            ));
                            sweeper_running = true;
                        }
                        self.tasks.lock().push(spawn_udp_listener(
                            socket,
                            Arc::clone(&self.sessions),
                            Arc::clone(&self.bundle),
                            Arc::clone(&self.terminate),
                            self.shutdown_tx.subscribe(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Signals every listener to exit at its next boundary.
    pub fn stop(&self) {
        self.terminate.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Waits for the group's tasks to finish, warning on stragglers.
    pub async fn join(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "listener task failed"),
                Err(_) => warn!("listener task did not stop in time"),
            }
        }
    }

    /// Addresses actually bound, as `(net_type, addr)` pairs. Useful when
    /// ports are configured as 0.
    #[must_use]
    pub fn bound_addrs(&self) -> Vec<(String, SocketAddr)> {
        self.bound.lock().clone()
    }

    /// The group's UDP session map.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionMap> {
        &self.sessions
    }
}

impl std::fmt::Debug for ServeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServeGroup")
            .field("handler", &self.bundle.config.handler_name)
            .field("bound", &self.bound_addrs())
            .field("terminated", &self.terminate.load(Ordering::SeqCst))
            .finish()
    }
}

/// Builds and starts a serve group per configuration entry, resolving each
/// handler by name.
pub async fn listen_and_serve_groups(
    configs: Vec<NetServeConfig>,
    resolver: &HandlerResolver,
) -> Result<Vec<ServeGroup>> {
    let mut groups = Vec::with_capacity(configs.len());
    for config in configs {
        let handler = resolver(&config.handler_name).ok_or_else(|| {
            ServerError::config_invalid(
                "group.handler_name",
                format!("no handler named '{}'", config.handler_name),
            )
        })?;
        let group = ServeGroup::new(config, handler)?;
        group.serve().await?;
        groups.push(group);
    }
    Ok(groups)
}
