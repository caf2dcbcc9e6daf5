//! Concurrent account storage.
//!
//! The store is a read-mostly map from account name to [`Account`]. Lookups
//! of existing accounts take only the shared lock; the exclusive lock is
//! held just long enough to install a missing account. Handles are `Arc`s,
//! so in-flight request tasks keep their account alive and valid across
//! concurrent [`reset_all`](AccountStore::reset_all) iterations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::account::Account;

/// Concurrent mapping from account name to [`Account`].
///
/// Once a name has been referenced, exactly one `Account` instance exists
/// for it for the life of the process; there is no eviction.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: RwLock<HashMap<String, Arc<Account>>>,
}

impl AccountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the account for `name`, creating it if this is the first
    /// reference. The returned flag is `true` only for the call that
    /// installed the account.
    ///
    /// Fast path: presence check under the read lock. On a miss the write
    /// lock is taken and the map re-checked, because another caller may have
    /// installed the account between the two lock acquisitions.
    pub fn load_or_create(&self, name: &str) -> (Arc<Account>, bool) {
        if let Some(account) = self.accounts.read().unwrap().get(name) {
            return (account.clone(), false);
        }

        let mut accounts = self.accounts.write().unwrap();
        if let Some(account) = accounts.get(name) {
            return (account.clone(), false);
        }
        let account = Arc::new(Account::new(name));
        accounts.insert(name.to_string(), account.clone());
        (account, true)
    }

    /// Refill every bucket of every account to its capacity.
    ///
    /// Holds only the read lock: the map structure is not mutated here, and
    /// bucket mutation is serialized per-bucket. A decrement racing with the
    /// sweep lands either before or after that bucket's reset; both orders
    /// are valid outcomes.
    pub fn reset_all(&self) {
        let accounts = self.accounts.read().unwrap();
        for account in accounts.values() {
            account.reset();
        }
    }

    /// Number of accounts ever referenced.
    pub fn len(&self) -> usize {
        self.accounts.read().unwrap().len()
    }

    /// Whether any account has been referenced yet.
    pub fn is_empty(&self) -> bool {
        self.accounts.read().unwrap().is_empty()
    }
}
