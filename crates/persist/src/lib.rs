//! Persistence: the single best-time record kept between runs.
//!
//! # Invariants
//! - The record is schema-versioned and carries a SHA-256 digest.
//! - Loading fails closed: a record that fails any check is never returned.

pub mod record;

pub use record::{RECORD_KEY, RECORD_SCHEMA_VERSION, RecordError, RecordStore};
