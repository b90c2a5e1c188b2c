//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod logging;
mod output;
mod strategy;

pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use strategy::FileStrategyConfig;

use forge_domain::{ConfigIssue, ConsensusStrategy, validate_strategy};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Sampling strategy overrides
    pub strategy: FileStrategyConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks the strategy as it would resolve on top of the default
    /// strategy, then the enum-valued string fields and the log paths.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(validate_strategy(
            &self.strategy.apply_to(ConsensusStrategy::default()),
        ));
        issues.extend(self.output.parse_format().1);
        issues.extend(self.logging.validate());

        issues
    }
}
