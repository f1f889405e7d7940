//! # krill
//!
//! Async TCP client for the Rookery binary cache protocol.
//!
//! *Krill* is what penguins eat - and `"penguins"` is the canonical session
//! token the protocol ships with.
//!
//! ## Features
//!
//! - Binary wire protocol (SET, GET, DEL, RAL) with length-prefixed fields
//! - Session token written in front of every frame, plus the bare-token
//!   handshake on connect
//! - Fire-and-forget sends through a background connection task
//! - Automatic reconnect with exponential backoff and jitter
//! - Raw, uncorrelated response stream
//! - Prometheus metrics
//!
//! ## Example
//!
//! ```ignore
//! use krill::client::Client;
//! use krill::config::Config;
//! use krill::metrics::Metrics;
//! use krill::protocol::Ttl;
//!
//! let config = Config::default();
//! let (client, mut responses) = Client::connect(config, metrics, cancel_token);
//! client.set("foo", "bar", Ttl::from_secs(10)).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    frames    ┌──────────────────┐     TCP      ┌─────────┐
//! │ Client       │─────────────▶│ connection task  │─────────────▶│ Rookery │
//! │ (validate +  │   (bounded   │  ├─ single writer│◀─────────────│ server  │
//! │  encode)     │    queue)    │  ├─ reconnect    │  raw bytes   └─────────┘
//! └──────────────┘              │  └─ backoff      │
//!        ▲                      └──────────────────┘
//!        │ state watch / response channel  │
//!        └──────────────────────────────────┘
//! ```

// Modules
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod prelude;
pub mod protocol;

// Re-exports for convenience
pub use client::{Client, ConnectionState};
pub use error::{KrillError, ProtocolError, Result};
