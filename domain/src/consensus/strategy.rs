//! Consensus sampling strategy
//!
//! A [`ConsensusStrategy`] controls how many samples a step draws before it
//! commits to an answer. Partial settings (from config files or CLI flags)
//! are expressed as [`StrategyOverrides`] and merged field by field onto a
//! base strategy.

use serde::{Deserialize, Serialize};

/// Sampling strategy for a consensus step
///
/// - `initial_samples`: minimum number of attempts before early stopping may trigger
/// - `k`: lead margin the front-runner needs over the runner-up to stop early
/// - `max_samples`: hard cap on attempts (accepted + rejected), defaults to `initial_samples`
///
/// # Example
///
/// ```
/// use forge_domain::consensus::ConsensusStrategy;
///
/// let strategy = ConsensusStrategy::new(2).with_k(1).with_max_samples(6);
/// let bounds = strategy.bounds();
/// assert_eq!(bounds.initial, 2);
/// assert_eq!(bounds.max, 6);
/// assert_eq!(bounds.k, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusStrategy {
    /// Number of samples to collect before voting may stop early
    pub initial_samples: usize,
    /// How far ahead a candidate must be to be selected early
    pub k: usize,
    /// Optional hard cap to avoid runaway sampling
    pub max_samples: Option<usize>,
}

impl Default for ConsensusStrategy {
    fn default() -> Self {
        Self {
            initial_samples: 1,
            k: 1,
            max_samples: None,
        }
    }
}

impl ConsensusStrategy {
    /// Create a strategy with the given initial sample count and default `k`
    pub fn new(initial_samples: usize) -> Self {
        Self {
            initial_samples,
            ..Self::default()
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    /// Apply overrides field by field; unset fields keep the current value.
    pub fn merge(self, overrides: &StrategyOverrides) -> Self {
        Self {
            initial_samples: overrides.initial_samples.unwrap_or(self.initial_samples),
            k: overrides.k.unwrap_or(self.k),
            max_samples: overrides.max_samples.or(self.max_samples),
        }
    }

    /// Resolve the effective loop bounds.
    ///
    /// `initial` is at least 1 and `max` is never below `initial`.
    pub fn bounds(&self) -> SamplingBounds {
        let initial = self.initial_samples.max(1);
        let max = self.max_samples.unwrap_or(initial).max(initial);
        SamplingBounds {
            initial,
            max,
            k: self.k,
        }
    }
}

/// Effective sampling bounds derived from a [`ConsensusStrategy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingBounds {
    pub initial: usize,
    pub max: usize,
    pub k: usize,
}

impl SamplingBounds {
    /// Whether the loop may stop after attempt `index` given the current lead margin.
    pub fn should_stop(&self, index: usize, margin: usize) -> bool {
        index + 1 >= self.initial && margin >= self.k
    }
}

/// Partial strategy settings, typically read from a config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOverrides {
    pub initial_samples: Option<usize>,
    pub k: Option<usize>,
    pub max_samples: Option<usize>,
}

impl StrategyOverrides {
    pub fn is_empty(&self) -> bool {
        self.initial_samples.is_none() && self.k.is_none() && self.max_samples.is_none()
    }
}
