//! Background connection task
//!
//! Owns the TCP stream. Pulls pre-encoded frames off the command queue and
//! writes each one fully before starting the next, while forwarding whatever
//! the server sends back. When the connection drops it runs the reconnect
//! cycle with backoff.

use super::state::{ConnectionState, RetryPolicy};
use crate::config::Config;
use crate::error::{KrillError, Result};
use crate::metrics::Metrics;
use crate::protocol::FrameWriter;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One pre-encoded frame queued for the writer
pub(crate) struct OutboundFrame {
    pub(crate) name: &'static str,
    pub(crate) bytes: Bytes,
}

/// How a connection cycle ended, when it did not end in an error
enum CycleEnd {
    /// Server closed the socket
    PeerClosed,
    /// Every client handle is gone, nothing left to send
    ClientDropped,
}

/// State owned by the background task
pub(crate) struct ConnectionTask {
    config: Config,
    metrics: Arc<Metrics>,
    cmd_rx: mpsc::Receiver<OutboundFrame>,
    resp_tx: mpsc::Sender<Bytes>,
    state_tx: watch::Sender<ConnectionState>,
    cancel_token: CancellationToken,
    policy: RetryPolicy,
    handshake: Bytes,
}

impl ConnectionTask {
    pub(crate) fn new(
        config: Config,
        metrics: Arc<Metrics>,
        cmd_rx: mpsc::Receiver<OutboundFrame>,
        resp_tx: mpsc::Sender<Bytes>,
        state_tx: watch::Sender<ConnectionState>,
        cancel_token: CancellationToken,
    ) -> Self {
        let policy = RetryPolicy::new(&config.reconnect);
        let token = Bytes::copy_from_slice(config.connection.auth_token.as_bytes());
        let mut writer = FrameWriter::new(token.clone(), token.len());
        writer.handshake();
        let handshake = writer.take().freeze();

        Self {
            config,
            metrics,
            cmd_rx,
            resp_tx,
            state_tx,
            cancel_token,
            policy,
            handshake,
        }
    }

    /// Run until cancelled, the client handle is dropped, or the reconnect
    /// attempt budget is exhausted
    pub(crate) async fn run(mut self) {
        let cancel = self.cancel_token.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.set_state(ConnectionState::Closed);
                    break;
                }
                end = self.run_cycle() => {
                    self.metrics.connected.set(0);
                    match end {
                        Ok(CycleEnd::ClientDropped) => {
                            debug!("Client handle dropped, stopping connection task");
                            self.set_state(ConnectionState::Closed);
                            break;
                        }
                        Ok(CycleEnd::PeerClosed) => {
                            info!("Server closed the connection");
                            self.set_state(ConnectionState::Disconnected);
                        }
                        Err(e) => {
                            warn!("Connection error: {}", e);
                            self.set_state(ConnectionState::Disconnected);
                        }
                    }

                    match self.policy.next_delay() {
                        Some(delay) => {
                            info!(
                                "Reconnecting in {:?} (attempt {})",
                                delay,
                                self.policy.attempts()
                            );
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {
                                    self.metrics.reconnects.inc();
                                }
                                _ = cancel.cancelled() => {
                                    self.set_state(ConnectionState::Closed);
                                    break;
                                }
                            }
                        }
                        None => {
                            error!(
                                "Giving up after {} failed reconnect attempts",
                                self.policy.attempts()
                            );
                            self.set_state(ConnectionState::Failed);
                            break;
                        }
                    }
                }
            }
        }

        self.metrics.connected.set(0);
        debug!("Connection task stopped");
    }

    /// One connect-and-pump cycle
    async fn run_cycle(&mut self) -> Result<CycleEnd> {
        let stream = match self.establish().await {
            Ok(stream) => stream,
            Err(e) => {
                self.metrics.connect_failures.inc();
                return Err(e);
            }
        };
        self.session(stream).await
    }

    /// Connect, write the token handshake, and mark the connection active
    async fn establish(&mut self) -> Result<TcpStream> {
        self.set_state(ConnectionState::Connecting);
        self.metrics.connect_attempts.inc();
        let started = Instant::now();

        let mut stream = self.connect_once().await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        // The server expects the bare session token as the first bytes of a
        // fresh connection, before any frame.
        stream.write_all(&self.handshake).await?;
        self.metrics.bytes_written.inc_by(self.handshake.len() as u64);
        self.set_state(ConnectionState::Authenticated);

        self.metrics
            .connect_latency
            .observe(started.elapsed().as_secs_f64());
        self.set_state(ConnectionState::Active);
        self.metrics.connected.set(1);
        self.policy.reset();
        info!("Connected to {}", self.config.connection.server_addr);

        Ok(stream)
    }

    async fn connect_once(&self) -> Result<TcpStream> {
        let addr = &self.config.connection.server_addr;
        let timeout_secs = self.config.connection.connect_timeout_secs;
        debug!("Connecting to {}", addr);

        if timeout_secs == 0 {
            return Ok(TcpStream::connect(addr.as_str()).await?);
        }

        match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            TcpStream::connect(addr.as_str()),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(KrillError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("Connect to {addr} timed out"),
            ))),
        }
    }

    /// Pump frames out and response bytes in until the session ends
    async fn session(&mut self, mut stream: TcpStream) -> Result<CycleEnd> {
        let mut read_buf = BytesMut::with_capacity(self.config.connection.read_buffer_size);

        loop {
            tokio::select! {
                maybe_frame = self.cmd_rx.recv() => {
                    match maybe_frame {
                        Some(frame) => {
                            stream.write_all(&frame.bytes).await?;
                            self.metrics.frames_sent.inc();
                            self.metrics.bytes_written.inc_by(frame.bytes.len() as u64);
                            debug!("Wrote {} frame ({} bytes)", frame.name, frame.bytes.len());
                        }
                        None => return Ok(CycleEnd::ClientDropped),
                    }
                }
                result = stream.read_buf(&mut read_buf) => {
                    match result {
                        Ok(0) => return Ok(CycleEnd::PeerClosed),
                        Ok(n) => {
                            self.metrics.bytes_read.inc_by(n as u64);
                            self.metrics.responses_received.inc();

                            let chunk = read_buf.split().freeze();
                            // The frozen chunk keeps its allocation, so start a fresh one.
                            read_buf.reserve(self.config.connection.read_buffer_size);

                            match self.resp_tx.try_send(chunk) {
                                Ok(()) => {}
                                Err(TrySendError::Full(_)) => {
                                    self.metrics.responses_dropped.inc();
                                    warn!("Response queue full, dropping {} bytes", n);
                                }
                                Err(TrySendError::Closed(_)) => {
                                    // Nobody is listening; keep the connection
                                    // alive for outbound frames.
                                }
                            }
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("Connection state: {}", state);
        self.state_tx.send_replace(state);
    }
}
