//! Wire message parsing.
//!
//! One request is the ASCII line `NAME,CLASS,CAPACITY,COST`:
//!
//! ```text
//! request  := name "," class "," capacity "," cost
//! name     := one or more bytes, no comma
//! class    := "l" | "w" | "q"
//! capacity := decimal integer, > 0
//! cost     := decimal integer, > 0
//! ```
//!
//! Leading and trailing whitespace (including the terminating newline on
//! TCP) is trimmed before splitting. The parser is total: every input maps
//! to either a [`DecisionRequest`] or a [`ParseError`] whose
//! [`reason`](ParseError::reason) labels the errored-messages counter.

use std::fmt;

use crate::account::ClassCode;

/// A validated admission query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRequest {
    /// Account the query is drawn against. Non-empty, comma-free.
    pub account_name: String,
    /// Which of the account's three buckets to draw from.
    pub class: ClassCode,
    /// The per-second quota the client currently holds for this class.
    pub capacity: i64,
    /// How much this request drains from the bucket.
    pub cost: i64,
}

impl DecisionRequest {
    /// Canonical wire form, without a trailing newline.
    pub fn to_line(&self) -> String {
        format!("{},{},{},{}", self.account_name, self.class, self.capacity, self.cost)
    }
}

/// Why a line failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Not exactly four comma-separated fields.
    FieldCount,
    /// A field was empty.
    EmptyField,
    /// The class field was not one of `l`, `w`, `q`.
    InvalidClass,
    /// The capacity field was not a plain decimal integer.
    InvalidCapacity,
    /// The capacity parsed but was not strictly positive.
    NonPositiveCapacity,
    /// The cost field was not a plain decimal integer.
    InvalidCost,
    /// The cost parsed but was not strictly positive.
    NonPositiveCost,
}

impl ParseError {
    /// Stable label for the `messages_errored_total{reason}` counter.
    pub fn reason(self) -> &'static str {
        match self {
            Self::FieldCount => "field_count",
            Self::EmptyField => "empty_field",
            Self::InvalidClass => "invalid_class",
            Self::InvalidCapacity => "invalid_capacity",
            Self::NonPositiveCapacity => "non_positive_capacity",
            Self::InvalidCost => "invalid_cost",
            Self::NonPositiveCost => "non_positive_cost",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount => {
                write!(f, "message must contain 4 fields separated by commas")
            }
            Self::EmptyField => write!(f, "missing account/class/capacity/cost field"),
            Self::InvalidClass => write!(f, "class must be l/w/q"),
            Self::InvalidCapacity => write!(f, "cannot parse capacity as an integer"),
            Self::NonPositiveCapacity => write!(f, "capacity must be positive"),
            Self::InvalidCost => write!(f, "cannot parse cost as an integer"),
            Self::NonPositiveCost => write!(f, "cost must be positive"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one wire line into a [`DecisionRequest`].
pub fn parse(line: &str) -> Result<DecisionRequest, ParseError> {
    let line = line.trim();
    let mut fields = line.split(',');
    let name = fields.next().unwrap_or("");
    let class = fields.next().ok_or(ParseError::FieldCount)?;
    let capacity = fields.next().ok_or(ParseError::FieldCount)?;
    let cost = fields.next().ok_or(ParseError::FieldCount)?;
    if fields.next().is_some() {
        return Err(ParseError::FieldCount);
    }

    if name.is_empty() || class.is_empty() || capacity.is_empty() || cost.is_empty() {
        return Err(ParseError::EmptyField);
    }

    let class = ClassCode::from_wire(class).ok_or(ParseError::InvalidClass)?;
    let capacity =
        parse_positive(capacity, ParseError::InvalidCapacity, ParseError::NonPositiveCapacity)?;
    let cost = parse_positive(cost, ParseError::InvalidCost, ParseError::NonPositiveCost)?;

    Ok(DecisionRequest { account_name: name.to_string(), class, capacity, cost })
}

/// Parse a strictly positive decimal integer. An explicit sign is not part
/// of the grammar: `+` is rejected as unparseable, and a negative value
/// falls out as non-positive.
fn parse_positive(
    field: &str,
    invalid: ParseError,
    non_positive: ParseError,
) -> Result<i64, ParseError> {
    if field.starts_with('+') {
        return Err(invalid);
    }
    let n: i64 = field.parse().map_err(|_| invalid)?;
    if n <= 0 {
        return Err(non_positive);
    }
    Ok(n)
}
