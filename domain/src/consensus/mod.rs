//! Consensus sampling domain
//!
//! The building blocks for deciding on one answer from many noisy samples.
//!
//! # Core Concepts
//!
//! ## Strategy
//! How many samples to draw at minimum, how far ahead the front-runner must
//! be before stopping early, and the hard cap on attempts.
//!
//! ## Red Flags
//! Named predicates that discard a candidate before it is counted.
//!
//! ## Vote Tally
//! Accepted candidates grouped by canonical value, with a lead margin that
//! drives early stopping.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  one attempt                                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  generate ──► output schema ──► red flags ──► tally ──► stop? │
//! │      │              │               │                         │
//! │      └── invalid ───┘            flagged                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod red_flag;
pub mod strategy;
pub mod tally;

pub use red_flag::{RedFlagRule, RedFlags};
pub use strategy::{ConsensusStrategy, SamplingBounds, StrategyOverrides};
pub use tally::{Leaders, TallyEntry, VoteTally, canonical_key};
