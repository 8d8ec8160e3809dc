//! Server configuration
//!
//! The only externally visible knob is the listening port: first CLI
//! argument, then `CHAT_PORT`, then the built-in default.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::AppError;

/// Default listening port
pub const DEFAULT_PORT: u16 = 12345;

/// Environment variable overriding the port
pub const PORT_ENV_VAR: &str = "CHAT_PORT";

/// Per-connection outbound queue capacity
const OUTBOUND_BUFFER_SIZE: usize = 64;

/// Longest the broadcaster waits on one recipient
const DELIVERY_TIMEOUT: Duration = Duration::from_millis(500);

/// Longest a closing connection may spend flushing before it is cut
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub outbound_buffer: usize,
    pub delivery_timeout: Duration,
    pub close_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            outbound_buffer: OUTBOUND_BUFFER_SIZE,
            delivery_timeout: DELIVERY_TIMEOUT,
            close_timeout: CLOSE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Build the config from the process arguments and environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_sources(env::args().nth(1), env::var(PORT_ENV_VAR).ok())
    }

    /// Resolve the port from an optional CLI argument and env value
    ///
    /// The argument wins over the environment.
    pub fn from_sources(arg: Option<String>, env_port: Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(raw) = arg.or(env_port) {
            config.port = raw
                .trim()
                .parse()
                .map_err(|_| AppError::InvalidPort(raw.clone()))?;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
