//! Application layer for quorum-forge
//!
//! This crate contains the step and pipeline use cases together with the
//! ports they drive. It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    event_sink::{Erased, EventLog, EventSink, NoEvents, Tee},
    generator::{AsyncFnGenerator, FnGenerator, Generator, GeneratorError},
};
pub use use_cases::run_pipeline::{Pipeline, Transition};
pub use use_cases::run_step::{SampleError, Step, StepError, StepOutcome};
