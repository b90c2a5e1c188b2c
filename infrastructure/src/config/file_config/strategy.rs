//! Sampling strategy configuration from TOML (`[strategy]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [strategy]
//! initial_samples = 2
//! k = 1
//! max_samples = 6
//! ```

use forge_domain::{ConsensusStrategy, StrategyOverrides};
use serde::{Deserialize, Serialize};

/// Raw strategy settings. Unset fields keep the step's own value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStrategyConfig {
    /// Samples drawn before early stopping is considered
    pub initial_samples: Option<usize>,
    /// Required lead of the winner over the runner-up
    pub k: Option<usize>,
    /// Hard cap on attempts
    pub max_samples: Option<usize>,
}

impl FileStrategyConfig {
    pub fn to_overrides(&self) -> StrategyOverrides {
        StrategyOverrides {
            initial_samples: self.initial_samples,
            k: self.k,
            max_samples: self.max_samples,
        }
    }

    /// Apply these settings on top of `base`.
    pub fn apply_to(&self, base: ConsensusStrategy) -> ConsensusStrategy {
        base.merge(&self.to_overrides())
    }
}
