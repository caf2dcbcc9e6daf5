//! The request-decision pipeline shared by both front ends.
//!
//! Each incoming line flows parse → load-or-create → try-decrement and
//! collapses to a single-byte [`Decision`]. Every path updates the message
//! counters; malformed input converts to a deny without touching any
//! bucket.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::message;
use crate::metrics::Metrics;
use crate::store::AccountStore;

/// The two possible replies to an admission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed; its cost has been drained from the bucket.
    Permit,
    /// The request is rejected; no bucket state changed.
    Deny,
}

impl Decision {
    /// The wire reply byte: `p` or `d`.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Permit => b'p',
            Self::Deny => b'd',
        }
    }

    /// The metrics label for the `permitted` dimension.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permit => "p",
            Self::Deny => "d",
        }
    }

    pub fn is_permit(self) -> bool {
        matches!(self, Self::Permit)
    }
}

/// Which front end a message arrived on. Only used for labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

/// Stateless-per-call decision maker over the shared account store.
///
/// Cloning shares the store and the metrics bundle, so one engine can be
/// handed to every front-end task.
#[derive(Clone)]
pub struct DecisionEngine {
    store: Arc<AccountStore>,
    metrics: Metrics,
}

impl DecisionEngine {
    pub fn new(store: Arc<AccountStore>, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// The account store decisions are drawn against.
    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    /// The metrics bundle this engine updates.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Decide one wire line.
    ///
    /// Never fails: a malformed line is counted, logged, and answered with
    /// [`Decision::Deny`]. The whole path is synchronous and O(1): a parse,
    /// one map lookup, and one bucket critical section.
    pub fn decide_line(&self, protocol: Protocol, line: &str) -> Decision {
        self.metrics.messages_received.with_label_values(&[protocol.as_str()]).inc();

        let request = match message::parse(line) {
            Ok(request) => request,
            Err(err) => {
                self.metrics.messages_errored.with_label_values(&[err.reason()]).inc();
                warn!(
                    protocol = protocol.as_str(),
                    line,
                    error = %err,
                    "rejecting malformed message"
                );
                return Decision::Deny;
            }
        };

        let (account, created) = self.store.load_or_create(&request.account_name);
        if created {
            self.metrics.account_map_keys.set(self.store.len() as i64);
        }

        let permitted = account.bucket(request.class).try_decrement(request.cost, request.capacity);
        let decision = if permitted { Decision::Permit } else { Decision::Deny };

        self.metrics
            .messages_handled
            .with_label_values(&[request.class.as_str(), decision.as_str()])
            .inc();
        debug!(
            protocol = protocol.as_str(),
            account = %request.account_name,
            class = %request.class,
            permitted,
            "handled message"
        );
        decision
    }
}
