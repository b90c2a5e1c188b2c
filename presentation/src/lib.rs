//! Presentation layer for quorum-forge
//!
//! This crate contains CLI definitions, output formatters,
//! and progress reporters driven by pipeline events.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{EventPrinter, ProgressReporter, SimpleProgress};
