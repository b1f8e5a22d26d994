// ============================================
// File: crates/ferrogate-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! One `NetServeConfig` describes a listener group: the cross-product of
//! net types, listen IPs and ports bound to one cipher, decoder and
//! handler. A TOML file carries any number of `[[group]]` tables plus a
//! `[logging]` section.
//!
//! ## Example Configuration
//! ```toml
//! [logging]
//! level = "info"
//!
//! [[group]]
//! port = [7001, 7002]
//! net_type = ["tcp", "udp"]
//! listen_ip = ["0.0.0.0"]
//! cipher = ["sz12", "<base64 PKCS#1 private key>"]
//! code_type = "sz12"
//! handler_name = "echo"
//! read_timeout = 30
//! write_timeout = 30
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Timeouts of 0 mean "no deadline"
//! - `debug = 1` inserts a 2-second pause before UDP responses, for
//!   client-side diagnostics only
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServerError};

// ============================================
// NetServeConfig
// ============================================

/// Configuration of one listener group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetServeConfig {
    /// Ports to listen on.
    #[serde(default)]
    pub port: Vec<u16>,

    /// Net types, each containing `tcp` or `udp` (platform variants like
    /// `tcp4` are accepted).
    #[serde(default = "default_net_types")]
    pub net_type: Vec<String>,

    /// IPs to bind.
    #[serde(default = "default_listen_ips")]
    pub listen_ip: Vec<String>,

    /// Cipher spec tuple; the first element selects the variant.
    #[serde(default)]
    pub cipher: Vec<String>,

    /// Payload decoder type: `nj11`, `sz12`, `mt` or `web`.
    #[serde(default = "default_code_type")]
    pub code_type: String,

    /// Per-message verbose logging for this group's sessions.
    #[serde(default)]
    pub log_verbose: bool,

    /// Read deadline in seconds; 0 disables it.
    #[serde(default)]
    pub read_timeout: u64,

    /// Write deadline in seconds; 0 disables it.
    #[serde(default)]
    pub write_timeout: u64,

    /// Diagnostic mode; 1 delays UDP responses by 2 seconds.
    #[serde(default)]
    pub debug: i32,

    /// Name resolved to an `ApiHandler` at startup.
    #[serde(default)]
    pub handler_name: String,
}

fn default_net_types() -> Vec<String> {
    vec!["tcp".to_string()]
}

fn default_listen_ips() -> Vec<String> {
    vec!["0.0.0.0".to_string()]
}

fn default_code_type() -> String {
    "sz12".to_string()
}

impl NetServeConfig {
    /// Validates the group configuration.
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(ServerError::config_invalid("group.port", "must not be empty"));
        }
        if self.net_type.is_empty() {
            return Err(ServerError::config_invalid(
                "group.net_type",
                "must not be empty",
            ));
        }
        for net_type in &self.net_type {
            if !net_type.contains("tcp") && !net_type.contains("udp") {
                return Err(ServerError::config_invalid(
                    "group.net_type",
                    format!("'{net_type}' is neither tcp nor udp"),
                ));
            }
        }
        for ip in &self.listen_ip {
            if ip.parse::<std::net::IpAddr>().is_err() {
                return Err(ServerError::config_invalid(
                    "group.listen_ip",
                    format!("'{ip}' is not an IP address"),
                ));
            }
        }
        if self.cipher.is_empty() {
            return Err(ServerError::config_invalid(
                "group.cipher",
                "must name a cipher variant",
            ));
        }
        if self.handler_name.is_empty() {
            return Err(ServerError::config_invalid(
                "group.handler_name",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Read deadline, if configured.
    #[must_use]
    pub const fn read_timeout(&self) -> Option<Duration> {
        if self.read_timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(self.read_timeout))
        }
    }

    /// Write deadline, if configured.
    #[must_use]
    pub const fn write_timeout(&self) -> Option<Duration> {
        if self.write_timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(self.write_timeout))
        }
    }

    /// Whether the UDP diagnostic delay is active.
    #[must_use]
    pub const fn debug_enabled(&self) -> bool {
        self.debug == 1
    }
}

impl Default for NetServeConfig {
    fn default() -> Self {
        Self {
            port: Vec::new(),
            net_type: default_net_types(),
            listen_ip: default_listen_ips(),
            cipher: Vec::new(),
            code_type: default_code_type(),
            log_verbose: false,
            read_timeout: 0,
            write_timeout: 0,
            debug: 0,
            handler_name: String::new(),
        }
    }
}

// ============================================
// ServeFileConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level server configuration file: listener groups plus logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServeFileConfig {
    /// Listener groups.
    #[serde(default, rename = "group")]
    pub groups: Vec<NetServeConfig>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServeFileConfig {
    /// Loads and validates a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("loading configuration from {path_str}");
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config = Self::from_toml(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every group.
    pub fn validate(&self) -> Result<()> {
        for group in &self.groups {
            group.validate()?;
        }
        Ok(())
    }
}

// ============================================
// Tests
// ============================================
