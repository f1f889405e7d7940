//! Configuration for krill

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub reconnect: ReconnectConfig,
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Cache server address (host:port)
    pub server_addr: String,

    /// Session token written in front of every frame
    pub auth_token: String,

    /// Connect timeout in seconds (0 = no timeout)
    pub connect_timeout_secs: u64,

    /// Read buffer size for inbound response bytes
    pub read_buffer_size: usize,

    /// Initial capacity of the frame encoding buffer
    pub write_buffer_size: usize,

    /// Outbound queue depth, in frames
    pub command_queue_size: usize,

    /// Inbound queue depth, in response chunks
    pub response_queue_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:4000".to_string(),
            auth_token: "penguins".to_string(),
            connect_timeout_secs: 10,
            read_buffer_size: 8192,
            write_buffer_size: 4096,
            command_queue_size: 1024,
            response_queue_size: 1024,
        }
    }
}

/// Reconnect backoff configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt (milliseconds)
    pub initial_delay_ms: u64,

    /// Upper bound for the exponential backoff delay (milliseconds)
    pub max_delay_ms: u64,

    /// Random jitter added on top of each delay (milliseconds)
    pub jitter_ms: u64,

    /// Give up after this many failed reconnect attempts (0 = retry forever)
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter_ms: 500,
            max_attempts: 0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::KrillError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| crate::KrillError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables or use defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("KRILL_SERVER_ADDR") {
            config.connection.server_addr = addr;
        }

        if let Ok(token) = std::env::var("KRILL_AUTH_TOKEN") {
            config.connection.auth_token = token;
        }

        if let Ok(timeout) = std::env::var("KRILL_CONNECT_TIMEOUT_SECS")
            && let Ok(n) = timeout.parse()
        {
            config.connection.connect_timeout_secs = n;
        }

        if let Ok(attempts) = std::env::var("KRILL_RECONNECT_MAX_ATTEMPTS")
            && let Ok(n) = attempts.parse()
        {
            config.reconnect.max_attempts = n;
        }

        config
    }
}
