//! Infrastructure layer
//!
//! Configuration loading, logging setup and cache bootstrap.

pub mod config;
pub mod logging;
pub mod setup;

pub use config::{ConfigError, ConfigLoader};
pub use logging::{LogConfig, LoggerImpl};
pub use setup::{build_cache_service, build_store};
