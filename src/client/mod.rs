//! Cache client for the Rookery binary protocol
//!
//! `Client` is a cheap handle. Commands are validated and encoded at the call
//! site, then queued to a background task that owns the TCP connection. The
//! task writes one frame at a time in queue order, reconnects with
//! exponential backoff when the connection drops, and forwards raw response
//! bytes on a bounded channel.

mod connection;
mod state;

pub use state::ConnectionState;

use crate::config::Config;
use crate::error::{KrillError, Result};
use crate::metrics::Metrics;
use crate::protocol::{FrameWriter, Ttl};
use bytes::Bytes;
use connection::{ConnectionTask, OutboundFrame};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to the background connection task
pub struct Client {
    cmd_tx: mpsc::Sender<OutboundFrame>,
    state_rx: watch::Receiver<ConnectionState>,
    cancel_token: CancellationToken,
    token: Bytes,
    write_buffer_size: usize,
    metrics: Arc<Metrics>,
    task: JoinHandle<()>,
}

impl Client {
    /// Spawn the background connection task.
    ///
    /// Returns the client handle and the stream of raw response bytes. The
    /// first connect attempt starts immediately; commands queued before the
    /// connection is up are written once it is.
    pub fn connect(
        config: Config,
        metrics: Arc<Metrics>,
        cancel_token: CancellationToken,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.connection.command_queue_size);
        let (resp_tx, resp_rx) = mpsc::channel(config.connection.response_queue_size);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let token = Bytes::copy_from_slice(config.connection.auth_token.as_bytes());
        let write_buffer_size = config.connection.write_buffer_size;

        let task = ConnectionTask::new(
            config,
            Arc::clone(&metrics),
            cmd_rx,
            resp_tx,
            state_tx,
            cancel_token.clone(),
        );
        let task = tokio::spawn(task.run());

        (
            Self {
                cmd_tx,
                state_rx,
                cancel_token,
                token,
                write_buffer_size,
                metrics,
                task,
            },
            resp_rx,
        )
    }

    /// Queue a SET frame.
    ///
    /// Fire-and-forget: Ok means the frame was validated and queued, not that
    /// the server stored anything.
    pub async fn set(
        &self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        ttl: Ttl,
    ) -> Result<()> {
        self.metrics.cmd_set.inc();
        let mut writer = self.writer();
        if let Err(e) = writer.set(key.as_ref(), value.as_ref(), ttl) {
            self.metrics.protocol_errors.inc();
            return Err(e.into());
        }
        self.enqueue("SET", writer).await
    }

    /// Queue a GET frame.
    ///
    /// The server's reply, if any, arrives uncorrelated on the response
    /// stream returned by [`Client::connect`].
    pub async fn get(&self, key: impl AsRef<[u8]>) -> Result<()> {
        self.metrics.cmd_get.inc();
        let mut writer = self.writer();
        if let Err(e) = writer.get(key.as_ref()) {
            self.metrics.protocol_errors.inc();
            return Err(e.into());
        }
        self.enqueue("GET", writer).await
    }

    /// Queue a DEL frame
    pub async fn del(&self, key: impl AsRef<[u8]>) -> Result<()> {
        self.metrics.cmd_del.inc();
        let mut writer = self.writer();
        if let Err(e) = writer.del(key.as_ref()) {
            self.metrics.protocol_errors.inc();
            return Err(e.into());
        }
        self.enqueue("DEL", writer).await
    }

    /// Queue a RAL frame
    pub async fn ral(&self) -> Result<()> {
        self.metrics.cmd_ral.inc();
        let mut writer = self.writer();
        writer.ral();
        self.enqueue("RAL", writer).await
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch channel for observing state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Cancel the background task and wait for it to stop.
    ///
    /// Frames still sitting in the queue are discarded.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        let _ = self.task.await;
    }

    fn writer(&self) -> FrameWriter {
        FrameWriter::new(self.token.clone(), self.write_buffer_size)
    }

    async fn enqueue(&self, name: &'static str, mut writer: FrameWriter) -> Result<()> {
        let bytes = writer.take().freeze();
        self.cmd_tx
            .send(OutboundFrame { name, bytes })
            .await
            .map_err(|_| KrillError::ConnectionClosed)
    }
}
