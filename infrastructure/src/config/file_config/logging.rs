//! Logging configuration from TOML (`[logging]` section)

use forge_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where run artifacts are written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file receiving every pipeline event
    pub events_file: Option<PathBuf>,
    /// File receiving tracing output in addition to stderr
    pub file: Option<PathBuf>,
}

impl FileLoggingConfig {
    /// Both logs append to their file, so they must not share one.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        match (&self.events_file, &self.file) {
            (Some(events), Some(file)) if events == file => vec![ConfigIssue::error(
                ConfigIssueCode::SharedLogPath {
                    path: events.clone(),
                },
                format!(
                    "logging.events_file and logging.file both point to {}",
                    events.display()
                ),
            )],
            _ => vec![],
        }
    }
}
