//! Infrastructure layer for quorum-forge
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading
//! and the JSONL event log.

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig, FileLoggingConfig, FileOutputConfig, FileStrategyConfig};
pub use logging::JsonlEventLogger;
