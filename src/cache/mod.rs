//! Response caching.
//!
//! - [`key`]: canonical request signatures. Two requests that differ only
//!   in query parameter order, host case, or default port collapse to the
//!   same [`CacheKey`].
//!
//! - [`response::ResponseCache`]: TTL-bounded store of decoded upstream
//!   payloads, consulted by the [`FetchOrchestrator`](crate::FetchOrchestrator)
//!   before every network call. TTL is the only eviction policy; a
//!   background sweeper (see [`ResponseCache::spawn_sweeper`]) bounds growth
//!   from keys that are written once and never read again.

pub mod key;
pub mod response;

pub use key::{CacheKey, generate_key};
pub use response::{CacheEntry, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL, Payload, ResponseCache};
