//! Logging infrastructure: structured event logging.
//!
//! Provides [`JsonlEventLogger`], a JSONL file writer that implements
//! the [`EventSink`](forge_application::EventSink) port for any serializable
//! event type.

mod jsonl_logger;

pub use jsonl_logger::JsonlEventLogger;
