#![forbid(unsafe_code)]

//! # quotagate
//!
//! A network-facing quota decision service for a rate-limited API.
//!
//! Clients send one-line admission queries (`NAME,CLASS,CAPACITY,COST`)
//! over UDP or TCP, and get back a single byte: `p` (permit) or `d` (deny).
//! The server keeps a token bucket per account and request class, refilled
//! to capacity once per second; the capacity travels on every request, so
//! quota policy lives entirely on the client side.
//!
//! ## Architecture
//!
//! - **Decision pipeline**: [`message::parse`] →
//!   [`AccountStore::load_or_create`](store::AccountStore::load_or_create) →
//!   [`Bucket::try_decrement`](bucket::Bucket::try_decrement), wrapped up in
//!   [`DecisionEngine`](engine::DecisionEngine).
//! - **Front ends**: a datagram loop ([`udp`]) and a line-oriented stream
//!   server ([`tcp`]), both funneling into the same engine.
//! - **Refill clock** ([`refill`]): one shared one-second tick resets every
//!   bucket to its capacity.
//! - **Supervisor** ([`server::Server`]): binds the sockets, fans out the
//!   long-running activities, and drains them on shutdown.
//!
//! ## Example
//!
//! ```rust
//! use quotagate::{parse, ClassCode};
//!
//! let request = parse("gb,l,10,1").expect("well-formed request");
//! assert_eq!(request.account_name, "gb");
//! assert_eq!(request.class, ClassCode::Lookup);
//! assert_eq!(request.capacity, 10);
//! assert_eq!(request.cost, 1);
//! ```

pub mod account;
pub mod bucket;
pub mod config;
pub mod engine;
pub mod exposition;
pub mod message;
pub mod metrics;
pub mod refill;
pub mod server;
pub mod store;
pub mod tcp;
pub mod udp;

// Re-exports
pub use account::{Account, ClassCode};
pub use bucket::{Bucket, BucketError};
pub use config::{Config, ConfigError};
pub use engine::{Decision, DecisionEngine, Protocol};
pub use message::{parse, DecisionRequest, ParseError};
pub use metrics::Metrics;
pub use server::{Server, ServerError};
pub use store::AccountStore;
