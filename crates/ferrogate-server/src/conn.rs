// ============================================
// File: crates/ferrogate-server/src/conn.rs
// ============================================
//! # Connection Wrapper
//!
//! ## Creation Reason
//! Runs one request/response cycle over a raw peer stream: read a message
//! through the transport cipher, decode the payload, dispatch to the
//! handler, flush. TCP connections close afterwards; UDP workers just
//! finish.
//!
//! ## State Machine
//! ```text
//! idle ── read ok ──► decrypted ── decode ok ──► dispatched ── flushed
//!   │                    │                           │
//!   └──── error ─────────┴──── logged ───────────────┴──► closed / dropped
//! ```
//!
//! ## Concurrency
//! The session context lock is taken once and held for the whole request,
//! so operations on one peer's context are serialized even when UDP
//! datagrams arrive in parallel.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Deadline expiries are routine (idle keep-alives); they log at debug,
//!   every other failure logs at error
//! - Handler writes funnel through the cipher; never hand the raw writer
//!   to application code
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{split, AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf};
use tokio::time::timeout;
use tracing::{debug, error};

use ferrogate_core::cipher::{NetWriter, TransCipher};
use ferrogate_core::{CoreError, NetConn, SessionContext};
use ferrogate_transport::RawIo;

use crate::error::Result;
use crate::group::ServeBundle;
use crate::sessions::SharedContext;

/// Diagnostic pause before UDP responses when `debug = 1`.
const UDP_DEBUG_DELAY: Duration = Duration::from_secs(2);

/// Collaborator told when the first response write happens; the HTTP
/// back-compat layer commits its 200 status here.
pub trait StatusSink: Send {
    /// Called once, before the first response byte is encoded.
    fn response_started(&mut self);
}

/// One request/response cycle over a raw peer stream.
pub struct Conn {
    peer: SocketAddr,
    reader: BufReader<ReadHalf<Box<dyn RawIo>>>,
    writer: BufWriter<WriteHalf<Box<dyn RawIo>>>,
    ctx: SharedContext,
    bundle: Arc<ServeBundle>,
    close_on_finish: bool,
    status: Option<Box<dyn StatusSink>>,
}

impl Conn {
    /// Wraps a raw peer stream.
    ///
    /// `close_on_finish` is set for TCP connections, which are shut down
    /// after the response; UDP workers only flush.
    #[must_use]
    pub fn new(
        raw: Box<dyn RawIo>,
        peer: SocketAddr,
        ctx: SharedContext,
        bundle: Arc<ServeBundle>,
        close_on_finish: bool,
    ) -> Self {
        let (reader, writer) = split(raw);
        Self {
            peer,
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            ctx,
            bundle,
            close_on_finish,
            status: None,
        }
    }

    /// Attaches the HTTP back-compat status collaborator.
    #[must_use]
    pub fn with_status_sink(mut self, sink: Box<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    /// Runs the request cycle, logging failures at the request boundary.
    pub async fn handle_request(mut self) {
        match self.run().await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                debug!(peer = %self.peer, "request deadline expired");
            }
            Err(e) => {
                error!(peer = %self.peer, error = %e, "request failed");
            }
        }
        self.finish().await;
    }

    async fn run(&mut self) -> Result<()> {
        let mut guard = Arc::clone(&self.ctx).lock_owned().await;
        guard.set_log_verbose(self.bundle.config.log_verbose);
        if guard.log_verbose() {
            debug!(peer = %self.peer, "reading request");
        }

        let decoded = {
            let read_fut = self.bundle.cipher.decode_read(&mut guard, &mut self.reader);
            match self.bundle.config.read_timeout() {
                Some(t) => timeout(t, read_fut)
                    .await
                    .map_err(|_| CoreError::TimeoutRead)?,
                None => read_fut.await,
            }?
        };

        let Some(raw) = decoded.filter(|d| !d.is_empty()) else {
            if guard.log_verbose() {
                debug!(peer = %self.peer, "request produced no data");
            }
            return Ok(());
        };

        let (api, data) = self.bundle.decoder.decode(&raw)?;
        if guard.log_verbose() {
            debug!(peer = %self.peer, api, len = data.len(), "dispatching request");
        }

        let write_timeout = self.bundle.config.write_timeout();
        let mut link = HandlerConn {
            peer: self.peer,
            ctx: &mut guard,
            writer: &mut self.writer,
            cipher: self.bundle.cipher.as_ref(),
            write_timeout,
            status: &mut self.status,
        };
        self.bundle.handler.handle_api(&mut link, api, &data).await?;

        if !self.close_on_finish && self.bundle.config.debug_enabled() {
            debug!(peer = %self.peer, "debug mode: delaying udp response");
            tokio::time::sleep(UDP_DEBUG_DELAY).await;
        }

        match write_timeout {
            Some(t) => timeout(t, self.writer.flush())
                .await
                .map_err(|_| CoreError::TimeoutWrite)??,
            None => self.writer.flush().await?,
        }
        Ok(())
    }

    async fn finish(&mut self) {
        if self.close_on_finish {
            let _ = self.writer.shutdown().await;
        } else {
            let _ = self.writer.flush().await;
        }
    }
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("peer", &self.peer)
            .field("close_on_finish", &self.close_on_finish)
            .finish_non_exhaustive()
    }
}

/// Connection surface handed to the handler; writes go through the
/// cipher's encode path while the session lock is held.
struct HandlerConn<'a> {
    peer: SocketAddr,
    ctx: &'a mut SessionContext,
    writer: &'a mut BufWriter<WriteHalf<Box<dyn RawIo>>>,
    cipher: &'a dyn TransCipher,
    write_timeout: Option<Duration>,
    status: &'a mut Option<Box<dyn StatusSink>>,
}

#[async_trait]
impl NetConn for HandlerConn<'_> {
    async fn write(&mut self, data: &[u8]) -> ferrogate_core::Result<()> {
        if let Some(mut sink) = self.status.take() {
            sink.response_started();
        }
        if data.is_empty() {
            return Ok(());
        }
        let writer: &mut NetWriter<'_> = &mut *self.writer;
        let fut = self.cipher.encode_write(self.ctx, writer, data);
        match self.write_timeout {
            Some(t) => timeout(t, fut).await.map_err(|_| CoreError::TimeoutWrite)?,
            None => fut.await,
        }
    }

    fn begin_stream(&mut self, total: usize, packsize: usize) {
        self.ctx.begin_stream(total, packsize);
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex as SyncMutex;
    use tokio::io::{duplex, AsyncReadExt};
    use tokio::sync::Mutex;

    use ferrogate_core::ApiHandler;

    use crate::config::NetServeConfig;

    struct RecordingHandler {
        calls: SyncMutex<Vec<(i32, Vec<u8>)>>,
    }

    impl RecordingHandler {
        fn new() -> Self {
            Self {
                calls: SyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ApiHandler for RecordingHandler {
        async fn handle_api(
            &self,
            conn: &mut dyn NetConn,
            api: i32,
            data: &[u8],
        ) -> ferrogate_core::Result<()> {
            self.calls.lock().push((api, data.to_vec()));
            conn.write(data).await
        }

        fn sapi_to_code(&self, _api: &str) -> i32 {
            0
        }

        fn api_to_code(&self, api: i32) -> i32 {
            api
        }

        fn query_app_secret_key(&self, _app: &str) -> String {
            String::new()
        }
    }

    fn test_peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn plain_mt_bundle(handler: Arc<dyn ApiHandler>, read_timeout: u64) -> Arc<ServeBundle> {
        let config = NetServeConfig {
            port: vec![0],
            cipher: vec!["plain".into()],
            code_type: "mt".into(),
            handler_name: "test".into(),
            read_timeout,
            ..NetServeConfig::default()
        };
        Arc::new(ServeBundle::new(config, handler).unwrap())
    }

    fn new_ctx() -> SharedContext {
        Arc::new(Mutex::new(SessionContext::new(test_peer())))
    }

    #[tokio::test]
    async fn test_request_cycle_dispatches_and_responds() {
        let handler = Arc::new(RecordingHandler::new());
        let bundle = plain_mt_bundle(Arc::clone(&handler) as Arc<dyn ApiHandler>, 0);

        let (mut client, server) = duplex(4096);
        let conn = Conn::new(Box::new(server), test_peer(), new_ctx(), bundle, true);
        let task = tokio::spawn(conn.handle_request());

        client.write_all(&[0x05, 0x00, 0xde, 0xad]).await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, [0xde, 0xad]);

        task.await.unwrap();
        let calls = handler.calls.lock();
        assert_eq!(calls.as_slice(), &[(5, vec![0xde, 0xad])]);
    }

    #[tokio::test]
    async fn test_empty_input_returns_silently() {
        let handler = Arc::new(RecordingHandler::new());
        let bundle = plain_mt_bundle(Arc::clone(&handler) as Arc<dyn ApiHandler>, 0);

        let (mut client, server) = duplex(1024);
        let conn = Conn::new(Box::new(server), test_peer(), new_ctx(), bundle, true);
        let task = tokio::spawn(conn.handle_request());

        client.shutdown().await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());

        task.await.unwrap();
        assert!(handler.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_envelope_closes_without_dispatch() {
        let handler = Arc::new(RecordingHandler::new());
        let bundle = plain_mt_bundle(Arc::clone(&handler) as Arc<dyn ApiHandler>, 0);

        let (mut client, server) = duplex(1024);
        let conn = Conn::new(Box::new(server), test_peer(), new_ctx(), bundle, true);
        let task = tokio::spawn(conn.handle_request());

        // One byte: too short for the binary envelope.
        client.write_all(&[0x05]).await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());

        task.await.unwrap();
        assert!(handler.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_deadline_expires_quietly() {
        let handler = Arc::new(RecordingHandler::new());
        let bundle = plain_mt_bundle(Arc::clone(&handler) as Arc<dyn ApiHandler>, 1);

        let (client, server) = duplex(1024);
        let conn = Conn::new(Box::new(server), test_peer(), new_ctx(), bundle, true);

        // Nothing is ever written; the deadline fires and the cycle ends.
        conn.handle_request().await;
        assert!(handler.calls.lock().is_empty());
        drop(client);
    }

    struct FlagSink(Arc<AtomicBool>);

    impl StatusSink for FlagSink {
        fn response_started(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_status_sink_fires_on_first_write() {
        let handler = Arc::new(RecordingHandler::new());
        let bundle = plain_mt_bundle(handler as Arc<dyn ApiHandler>, 0);
        let flag = Arc::new(AtomicBool::new(false));

        let (mut client, server) = duplex(1024);
        let conn = Conn::new(Box::new(server), test_peer(), new_ctx(), bundle, true)
            .with_status_sink(Box::new(FlagSink(Arc::clone(&flag))));
        let task = tokio::spawn(conn.handle_request());

        client.write_all(&[0x01, 0x00, 0xaa]).await.unwrap();
        client.shutdown().await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        task.await.unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }
}
