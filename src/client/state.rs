//! Connection lifecycle states and the reconnect backoff schedule

use crate::config::ReconnectConfig;
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Lifecycle of the single client connection.
///
/// `Closed` and `Failed` are terminal; the background task exits once it
/// publishes either of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket, and no connect attempt in flight
    Disconnected,
    /// TCP connect in progress
    Connecting,
    /// Socket established and the session token handshake written
    Authenticated,
    /// Frames are flowing
    Active,
    /// Shut down deliberately
    Closed,
    /// Reconnect attempt budget exhausted
    Failed,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::Active => "active",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Exponential backoff schedule for reconnect attempts.
///
/// Each delay doubles the previous one up to `max_delay`, with a random
/// jitter added so a fleet of clients does not reconnect in lockstep.
/// `reset` is called once a connection reaches the active state, so the
/// attempt budget only counts reconnects since the last good connection.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    jitter: u64,
    max_attempts: u32,
    current_delay: Duration,
    attempts: u32,
}

impl RetryPolicy {
    pub fn new(config: &ReconnectConfig) -> Self {
        let initial_delay = Duration::from_millis(config.initial_delay_ms);
        Self {
            initial_delay,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter_ms,
            max_attempts: config.max_attempts,
            current_delay: initial_delay,
            attempts: 0,
        }
    }

    /// Next backoff delay, or None once the attempt budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.max_attempts != 0 && self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;

        let jitter = if self.jitter == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..self.jitter))
        };
        let delay = self.current_delay + jitter;
        self.current_delay = (self.current_delay * 2).min(self.max_delay);
        Some(delay)
    }

    /// Forget past failures after a successful connection
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
        self.attempts = 0;
    }

    /// Consecutive failed attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
