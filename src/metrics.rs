//! Prometheus metrics for the decision pipeline and the front ends.
//!
//! All collectors live in one [`Metrics`] bundle registered into a
//! `prometheus::Registry`. Production code uses the process-wide instance
//! from [`Metrics::shared`]; tests construct their own bundle against a
//! fresh registry so nothing collides across test cases.

use std::sync::{Arc, OnceLock};

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

/// Metric namespace; every collector is exported as `quotagate_<name>`.
const NAMESPACE: &str = "quotagate";

/// Request-duration buckets, 100µs to 500µs.
const DURATION_BUCKETS: [f64; 5] = [0.0001, 0.0002, 0.0003, 0.0004, 0.0005];

static SHARED: OnceLock<Metrics> = OnceLock::new();

/// Every collector the service updates, registered into one registry.
///
/// Cloning is cheap: prometheus collectors are internally shared, so clones
/// observe into the same underlying series.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// `messages_received_total{protocol}`.
    pub(crate) messages_received: IntCounterVec,
    /// `messages_errored_total{reason}`.
    pub(crate) messages_errored: IntCounterVec,
    /// `messages_handled_total{class, permitted}`.
    pub(crate) messages_handled: IntCounterVec,
    /// `account_map_num_keys`.
    pub(crate) account_map_keys: IntGauge,
    /// `udp_request_duration_seconds`.
    pub(crate) udp_request_duration: Histogram,
    /// `tcp_request_duration_seconds`.
    pub(crate) tcp_request_duration: Histogram,
    /// `tcp_num_sockets`.
    pub(crate) tcp_sockets: IntGauge,
}

impl Metrics {
    /// Create the bundle and register every collector into `registry`.
    ///
    /// # Errors
    /// Returns an error if any collector cannot be registered (e.g. a name
    /// conflict with something already in the registry).
    pub fn new(registry: Registry) -> Result<Self, prometheus::Error> {
        let messages_received = IntCounterVec::new(
            Opts::new("messages_received_total", "Total number of messages received")
                .namespace(NAMESPACE),
            &["protocol"],
        )?;
        let messages_errored = IntCounterVec::new(
            Opts::new("messages_errored_total", "Total number of messages errored")
                .namespace(NAMESPACE),
            &["reason"],
        )?;
        let messages_handled = IntCounterVec::new(
            Opts::new("messages_handled_total", "Total number of messages handled")
                .namespace(NAMESPACE),
            &["class", "permitted"],
        )?;
        let account_map_keys = IntGauge::with_opts(
            Opts::new("account_map_num_keys", "Number of accounts in the account map")
                .namespace(NAMESPACE),
        )?;
        let udp_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "udp_request_duration_seconds",
                "Time spent processing a UDP request",
            )
            .namespace(NAMESPACE)
            .buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let tcp_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "tcp_request_duration_seconds",
                "Time spent processing a TCP request",
            )
            .namespace(NAMESPACE)
            .buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let tcp_sockets = IntGauge::with_opts(
            Opts::new("tcp_num_sockets", "Number of sockets open in the TCP server")
                .namespace(NAMESPACE),
        )?;

        registry.register(Box::new(messages_received.clone()))?;
        registry.register(Box::new(messages_errored.clone()))?;
        registry.register(Box::new(messages_handled.clone()))?;
        registry.register(Box::new(account_map_keys.clone()))?;
        registry.register(Box::new(udp_request_duration.clone()))?;
        registry.register(Box::new(tcp_request_duration.clone()))?;
        registry.register(Box::new(tcp_sockets.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            messages_received,
            messages_errored,
            messages_handled,
            account_map_keys,
            udp_request_duration,
            tcp_request_duration,
            tcp_sockets,
        })
    }

    /// The process-wide bundle.
    ///
    /// The first call installs the bundle; later calls return the same
    /// instance, so repeated initialization never re-registers collectors.
    pub fn shared() -> Metrics {
        SHARED
            .get_or_init(|| {
                // Panic is unreachable: registration into a brand-new
                // registry cannot conflict.
                Metrics::new(Registry::new()).expect("register metrics into a fresh registry")
            })
            .clone()
    }

    /// The registry backing this bundle, for exposition.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
