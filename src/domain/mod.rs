//! Domain layer for the request cache
//!
//! Key derivation, cached entries, per-request options, configuration models
//! and the storage port the services are written against.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{CacheError, CacheResult};
