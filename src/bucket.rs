//! A single quota bucket: a replenishable allowance with a reconfigurable
//! capacity.
//!
//! Buckets are reset to full capacity once per second by the refill clock;
//! between resets, every admitted request drains its cost from the remaining
//! value. The capacity travels on each request, so a bucket's quota can be
//! raised or lowered in place without any server-side reconfiguration.

use std::fmt;
use std::sync::Mutex;

/// Current value and capacity, mutated together under one lock.
#[derive(Debug, Default, Clone, Copy)]
struct BucketState {
    value: u64,
    capacity: u64,
}

/// A counter with a replenishable allowance.
///
/// A freshly created bucket is *unprimed* (`0/0`): it has never seen a
/// capacity. The first [`try_decrement`](Bucket::try_decrement) call primes
/// it, treating the pre-state as a full bucket at the newly declared
/// capacity, so a brand-new client is admitted up to its quota instead of
/// being denied until the next refill tick.
///
/// All mutation goes through a per-bucket `Mutex`; the critical section is
/// a handful of integer comparisons, so contention is cheap even with many
/// concurrent callers hammering the same account.
#[derive(Debug, Default)]
pub struct Bucket {
    state: Mutex<BucketState>,
}

/// Rejected arguments to [`Bucket::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketError {
    /// `value` was negative.
    NegativeValue(i64),
    /// `capacity` was negative.
    NegativeCapacity(i64),
    /// `value` exceeded `capacity`.
    ValueExceedsCapacity { value: i64, capacity: i64 },
}

impl fmt::Display for BucketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeValue(value) => {
                write!(f, "bucket value must be non-negative, got {}", value)
            }
            Self::NegativeCapacity(capacity) => {
                write!(f, "bucket capacity must be non-negative, got {}", capacity)
            }
            Self::ValueExceedsCapacity { value, capacity } => {
                write!(f, "bucket value {} exceeds capacity {}", value, capacity)
            }
        }
    }
}

impl std::error::Error for BucketError {}

impl Bucket {
    /// Create an unprimed bucket (`value = 0`, `capacity = 0`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to drain `cost` from the bucket, declaring `capacity` as the
    /// current quota.
    ///
    /// Executed atomically:
    ///
    /// 1. Non-positive `cost` or `capacity` is rejected outright with no
    ///    state change.
    /// 2. An unprimed bucket is first primed: `value` starts at the declared
    ///    capacity.
    /// 3. The declared capacity always replaces the stored one. An existing
    ///    `value` is never clamped here; only [`reset`](Bucket::reset)
    ///    re-aligns value with capacity.
    /// 4. The draw is all-or-nothing: if `value >= cost` the cost is
    ///    subtracted and the request is permitted, otherwise `value` is left
    ///    untouched and the request is denied. A denied request must not
    ///    degrade the allowance remaining for subsequent permitted ones.
    pub fn try_decrement(&self, cost: i64, capacity: i64) -> bool {
        if cost <= 0 || capacity <= 0 {
            return false;
        }
        let cost = cost as u64;
        let capacity = capacity as u64;

        let mut state = self.state.lock().unwrap();
        if state.capacity == 0 {
            state.value = capacity;
        }
        state.capacity = capacity;
        if state.value >= cost {
            state.value -= cost;
            true
        } else {
            false
        }
    }

    /// Refill the bucket: `value` becomes `capacity`.
    ///
    /// A no-op on an unprimed bucket.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.value = state.capacity;
    }

    /// Set both fields directly. Used by tests and initialization only.
    pub fn set(&self, value: i64, capacity: i64) -> Result<(), BucketError> {
        if value < 0 {
            return Err(BucketError::NegativeValue(value));
        }
        if capacity < 0 {
            return Err(BucketError::NegativeCapacity(capacity));
        }
        if value > capacity {
            return Err(BucketError::ValueExceedsCapacity { value, capacity });
        }
        let mut state = self.state.lock().unwrap();
        state.value = value as u64;
        state.capacity = capacity as u64;
        Ok(())
    }

    /// Current remaining allowance.
    pub fn value(&self) -> u64 {
        self.state.lock().unwrap().value
    }

    /// Current capacity.
    pub fn capacity(&self) -> u64 {
        self.state.lock().unwrap().capacity
    }

    /// Consistent `(value, capacity)` snapshot taken under the lock.
    pub fn snapshot(&self) -> (u64, u64) {
        let state = self.state.lock().unwrap();
        (state.value, state.capacity)
    }
}
