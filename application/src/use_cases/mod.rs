//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod run_pipeline;
pub mod run_step;
