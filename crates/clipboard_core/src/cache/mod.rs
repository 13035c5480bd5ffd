//! In-process lookup caches.
//!
//! # Responsibility
//! - Cache fully hydrated entities under a normalized secondary key.
//!
//! # Invariants
//! - Entries are created lazily on a successful lookup miss.
//! - Entries are removed only by explicit eviction or `clear`; no TTL.

pub mod alternate_key;

pub use alternate_key::{normalize_key, AlternateKeyCache};
