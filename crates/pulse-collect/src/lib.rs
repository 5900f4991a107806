//! Source adapters, rate limiting, and the collection cycle.
//!
//! A [`Collector`] is built once per process and drives cycles: each cycle
//! fans out to the Reddit and News adapters concurrently, normalizes and
//! scores what they return, and lands the results in the store in a single
//! transaction. One unreachable source degrades the cycle to partial; it
//! never aborts it.

pub mod cycle;
mod error;
mod normalize;
mod rate_limit;
mod retry;
pub mod sources;
mod types;

pub use cycle::{Collector, CycleReport, Endpoints};
pub use error::CollectError;
pub use normalize::{normalize_batch, ProcessedBatch};
pub use rate_limit::RateLimiter;
pub use types::RawItem;
