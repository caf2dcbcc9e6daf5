//! Accounts and the closed set of request classes they are metered by.

use std::fmt;

use crate::bucket::Bucket;

/// One of the three request classes a quota query can name.
///
/// The set is closed: the parser converts the wire byte to this enumeration
/// once, and everything downstream dispatches on the enum rather than on
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassCode {
    /// `l` on the wire.
    Lookup,
    /// `w` on the wire.
    Write,
    /// `q` on the wire.
    Query,
}

impl ClassCode {
    /// Every class, in wire order.
    pub const ALL: [ClassCode; 3] = [ClassCode::Lookup, ClassCode::Write, ClassCode::Query];

    /// Parse a wire field into a class code.
    pub fn from_wire(field: &str) -> Option<Self> {
        match field {
            "l" => Some(Self::Lookup),
            "w" => Some(Self::Write),
            "q" => Some(Self::Query),
            _ => None,
        }
    }

    /// Wire form, also used as the metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lookup => "l",
            Self::Write => "w",
            Self::Query => "q",
        }
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named account with one bucket per request class.
///
/// The three buckets are created together, unprimed; each takes its capacity
/// from the first request that names it. Accounts are created on first
/// reference and live for the rest of the process.
#[derive(Debug)]
pub struct Account {
    name: String,
    lookups: Bucket,
    writes: Bucket,
    queries: Bucket,
}

impl Account {
    /// Create an account with three unprimed buckets.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lookups: Bucket::new(),
            writes: Bucket::new(),
            queries: Bucket::new(),
        }
    }

    /// The account name as it appeared on the wire.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bucket metering `class`.
    pub fn bucket(&self, class: ClassCode) -> &Bucket {
        match class {
            ClassCode::Lookup => &self.lookups,
            ClassCode::Write => &self.writes,
            ClassCode::Query => &self.queries,
        }
    }

    /// Refill every bucket to its capacity.
    pub fn reset(&self) {
        self.lookups.reset();
        self.writes.reset();
        self.queries.reset();
    }
}
