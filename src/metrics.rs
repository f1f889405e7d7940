//! Prometheus metrics for krill

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

/// Global metrics instance
pub struct Metrics {
    pub registry: Registry,

    // Command counters
    pub cmd_set: IntCounter,
    pub cmd_get: IntCounter,
    pub cmd_del: IntCounter,
    pub cmd_ral: IntCounter,

    // Outbound traffic
    pub frames_sent: IntCounter,
    pub bytes_written: IntCounter,

    // Inbound traffic
    pub bytes_read: IntCounter,
    pub responses_received: IntCounter,
    pub responses_dropped: IntCounter,

    // Connection lifecycle
    pub connected: IntGauge,
    pub connect_attempts: IntCounter,
    pub connect_failures: IntCounter,
    pub reconnects: IntCounter,
    pub connect_latency: Histogram,

    // Error counters
    pub protocol_errors: IntCounter,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        let registry = Registry::new();

        let cmd_set = IntCounter::new("krill_cmd_set_total", "Total SET commands").unwrap();
        let cmd_get = IntCounter::new("krill_cmd_get_total", "Total GET commands").unwrap();
        let cmd_del = IntCounter::new("krill_cmd_del_total", "Total DEL commands").unwrap();
        let cmd_ral = IntCounter::new("krill_cmd_ral_total", "Total RAL commands").unwrap();

        let frames_sent =
            IntCounter::new("krill_frames_sent_total", "Total frames written to the socket")
                .unwrap();
        let bytes_written =
            IntCounter::new("krill_bytes_written_total", "Total bytes written").unwrap();

        let bytes_read = IntCounter::new("krill_bytes_read_total", "Total bytes read").unwrap();
        let responses_received = IntCounter::new(
            "krill_responses_received_total",
            "Total response chunks read from the server",
        )
        .unwrap();
        let responses_dropped = IntCounter::new(
            "krill_responses_dropped_total",
            "Response chunks discarded because the consumer queue was full",
        )
        .unwrap();

        let connected =
            IntGauge::new("krill_connected", "1 while the connection is active, else 0").unwrap();
        let connect_attempts =
            IntCounter::new("krill_connect_attempts_total", "Total connection attempts").unwrap();
        let connect_failures =
            IntCounter::new("krill_connect_failures_total", "Total failed connection attempts")
                .unwrap();
        let reconnects =
            IntCounter::new("krill_reconnects_total", "Total reconnect cycles entered").unwrap();

        let connect_latency = Histogram::with_opts(
            HistogramOpts::new(
                "krill_connect_latency_seconds",
                "Time from connect start to an authenticated connection",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )
        .unwrap();

        let protocol_errors =
            IntCounter::new("krill_protocol_errors_total", "Total protocol errors").unwrap();

        // Register all metrics
        registry.register(Box::new(cmd_set.clone())).unwrap();
        registry.register(Box::new(cmd_get.clone())).unwrap();
        registry.register(Box::new(cmd_del.clone())).unwrap();
        registry.register(Box::new(cmd_ral.clone())).unwrap();
        registry.register(Box::new(frames_sent.clone())).unwrap();
        registry.register(Box::new(bytes_written.clone())).unwrap();
        registry.register(Box::new(bytes_read.clone())).unwrap();
        registry
            .register(Box::new(responses_received.clone()))
            .unwrap();
        registry
            .register(Box::new(responses_dropped.clone()))
            .unwrap();
        registry.register(Box::new(connected.clone())).unwrap();
        registry
            .register(Box::new(connect_attempts.clone()))
            .unwrap();
        registry
            .register(Box::new(connect_failures.clone()))
            .unwrap();
        registry.register(Box::new(reconnects.clone())).unwrap();
        registry
            .register(Box::new(connect_latency.clone()))
            .unwrap();
        registry
            .register(Box::new(protocol_errors.clone()))
            .unwrap();

        Self {
            registry,
            cmd_set,
            cmd_get,
            cmd_del,
            cmd_ral,
            frames_sent,
            bytes_written,
            bytes_read,
            responses_received,
            responses_dropped,
            connected,
            connect_attempts,
            connect_failures,
            reconnects,
            connect_latency,
            protocol_errors,
        }
    }

    /// Get Prometheus formatted metrics
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
