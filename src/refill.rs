//! The once-per-second refill clock.
//!
//! One shared tick resets every bucket of every account to its capacity.
//! Deliberately coarse: per-request timestamp accounting would double the
//! bucket state and contend on a clock, and "per-second quota" is exactly
//! what a global one-second sweep advertises.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::store::AccountStore;

/// How often every bucket is topped back up.
pub const REFILL_INTERVAL: Duration = Duration::from_secs(1);

/// Run the refill clock until the shutdown signal fires.
///
/// Drift is not corrected and a missed tick is acceptable; the sweep simply
/// happens on the next tick.
pub async fn run(store: Arc<AccountStore>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = time::interval_at(time::Instant::now() + REFILL_INTERVAL, REFILL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                store.reset_all();
                debug!(accounts = store.len(), "refilled all buckets");
            }
            _ = shutdown.changed() => {
                info!("refill clock stopped");
                return;
            }
        }
    }
}
