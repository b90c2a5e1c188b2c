//! Configuration issue reporting.
//!
//! Detected problems in a configuration are returned as structured issues
//! with a severity, instead of failing on the first one.
//!
//! # Examples
//!
//! ```
//! use forge_domain::config::{validate_strategy, Severity};
//! use forge_domain::consensus::ConsensusStrategy;
//!
//! let issues = validate_strategy(&ConsensusStrategy::new(3).with_max_samples(1));
//! assert_eq!(issues.len(), 1);
//! assert_eq!(issues[0].severity, Severity::Warning);
//! ```

use crate::consensus::ConsensusStrategy;
use std::path::PathBuf;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// `initial_samples = 0` is treated as 1.
    ZeroInitialSamples,
    /// `max_samples` below `initial_samples` is raised to `initial_samples`.
    MaxBelowInitial { initial: usize, max: usize },
    /// A string field holds a value outside its allowed set.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// The event log and the trace log are the same file.
    SharedLogPath { path: PathBuf },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Check a strategy for settings that will be silently adjusted at run time.
pub fn validate_strategy(strategy: &ConsensusStrategy) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if strategy.initial_samples == 0 {
        issues.push(ConfigIssue::warning(
            ConfigIssueCode::ZeroInitialSamples,
            "strategy.initial_samples is 0; at least one sample is always drawn",
        ));
    }

    if let Some(max) = strategy.max_samples {
        let initial = strategy.initial_samples.max(1);
        if max < initial {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::MaxBelowInitial { initial, max },
                format!(
                    "strategy.max_samples ({}) is below initial_samples ({}); it will be raised to {}",
                    max, initial, initial
                ),
            ));
        }
    }

    issues
}
