//! Error types for krill

use thiserror::Error;

/// Main error type for krill
#[derive(Error, Debug)]
pub enum KrillError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The background connection task is gone (shut down or out of
    /// reconnect attempts), so the frame could not be queued.
    #[error("Connection is closed")]
    ConnectionClosed,
}

/// Wire protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid command tag: {0}")]
    InvalidCommand(String),

    #[error("Invalid TTL: {0:?}")]
    InvalidTtl(String),

    #[error("Key too long for the 4-byte length field")]
    KeyTooLong,

    #[error("Value too large for the 4-byte length field")]
    ValueTooLarge,

    #[error("Session token mismatch")]
    InvalidToken,

    #[error("Incomplete frame")]
    IncompleteFrame,
}

pub type Result<T> = std::result::Result<T, KrillError>;
