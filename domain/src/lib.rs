//! Domain layer for quorum-forge
//!
//! This crate contains the core concepts of consensus sampling: strategies,
//! red-flag rules, vote tallies, schemas, and the event protocol.
//! It has no dependencies on async runtimes, infrastructure, or presentation.
//!
//! # Core Concepts
//!
//! ## Step
//!
//! A step samples a noisy generator repeatedly, validates every sample,
//! discards red-flagged ones, and votes:
//!
//! - **Strategy**: minimum samples, required lead margin `k`, hard cap
//! - **Red Flags**: ordered predicates that reject a sample outright
//! - **Vote Tally**: canonical value → count, with a lead margin
//!
//! ## Pipeline
//!
//! An ordered, conditionally-branching sequence of steps that threads one
//! state value through every stage.

pub mod config;
pub mod consensus;
pub mod event;
pub mod schema;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity, validate_strategy};
pub use consensus::{
    ConsensusStrategy, Leaders, RedFlagRule, RedFlags, SamplingBounds, StrategyOverrides,
    TallyEntry, VoteTally, canonical_key,
};
pub use event::{PipelineEvent, StepEvent};
pub use schema::{JsonSchema, Schema, SchemaError, SchemaIssue, Validate, Validation};
