// ============================================
// File: crates/ferrogate-server/src/handlers/echo.rs
// ============================================
//! # Echo Handler
//!
//! Minimal [`ApiHandler`] so a configured server responds out of the box:
//! `ping` answers `pong`, everything else echoes its payload. Also handy
//! as the counterpart in listener tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use ferrogate_core::{ApiHandler, NetConn, Result};

/// API code for `ping`.
pub const API_PING: i32 = 1;

/// API code for `echo`.
pub const API_ECHO: i32 = 2;

/// Demo handler: ping/pong plus payload echo.
#[derive(Default)]
pub struct EchoHandler {
    secrets: HashMap<String, String>,
}

impl EchoHandler {
    /// Creates the handler with an empty secret table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the handler with per-app secrets for the signed web
    /// envelope.
    #[must_use]
    pub fn with_secrets(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl ApiHandler for EchoHandler {
    async fn handle_api(&self, conn: &mut dyn NetConn, api: i32, data: &[u8]) -> Result<()> {
        debug!(peer = %conn.peer_addr(), api, len = data.len(), "echo request");
        match api {
            API_PING => conn.write(b"pong").await,
            _ => conn.write(data).await,
        }
    }

    fn sapi_to_code(&self, api: &str) -> i32 {
        match api {
            "ping" => API_PING,
            "echo" => API_ECHO,
            _ => 0,
        }
    }

    fn api_to_code(&self, api: i32) -> i32 {
        api
    }

    fn query_app_secret_key(&self, app: &str) -> String {
        self.secrets.get(app).cloned().unwrap_or_default()
    }
}
