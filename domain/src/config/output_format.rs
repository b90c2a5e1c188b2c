//! Output format for finished runs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the CLI renders a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary of the final state (default)
    #[default]
    Summary,
    /// Final state as pretty-printed JSON
    Json,
    /// Every event as one JSON line, then nothing else
    Events,
}

impl OutputFormat {
    pub const VARIANTS: [&'static str; 3] = ["summary", "json", "events"];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Summary => "summary",
            OutputFormat::Json => "json",
            OutputFormat::Events => "events",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" | "s" => Ok(OutputFormat::Summary),
            "json" | "j" => Ok(OutputFormat::Json),
            "events" | "e" => Ok(OutputFormat::Events),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}
