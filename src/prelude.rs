//! Prelude module for common imports.
//!
//! This module re-exports commonly used types and traits for convenience.
//!
//! # Usage
//!
//! ```ignore
//! use krill::prelude::*;
//! ```

// Error types
pub use crate::error::{KrillError, ProtocolError, Result};

// Configuration
pub use crate::config::{Config, ConnectionConfig, ReconnectConfig};

// Client
pub use crate::client::{Client, ConnectionState};

// Protocol
pub use crate::protocol::{Command, FrameWriter, ParseResult, Ttl};

// Metrics
pub use crate::metrics::Metrics;

// Common external crates
pub use std::sync::Arc;
pub use tracing::{debug, error, info, trace, warn};
