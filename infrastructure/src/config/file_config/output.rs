//! Output configuration from TOML (`[output]` section)

use forge_domain::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
use serde::{Deserialize, Serialize};

/// Raw output configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Output format: "summary", "json" or "events"
    pub format: Option<String>,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

impl FileOutputConfig {
    /// Parse the format string, falling back to the default on unknown values.
    pub fn parse_format(&self) -> (Option<OutputFormat>, Vec<ConfigIssue>) {
        let Some(raw) = &self.format else {
            return (None, vec![]);
        };

        match raw.parse::<OutputFormat>() {
            Ok(format) => (Some(format), vec![]),
            Err(_) => {
                let issue = ConfigIssue {
                    severity: Severity::Warning,
                    code: ConfigIssueCode::InvalidEnumValue {
                        field: "output.format".to_string(),
                        value: raw.clone(),
                        valid_values: OutputFormat::VARIANTS
                            .iter()
                            .map(|v| v.to_string())
                            .collect(),
                    },
                    message: format!(
                        "output.format: unknown value '{}', falling back to '{}'",
                        raw,
                        OutputFormat::default()
                    ),
                };
                (Some(OutputFormat::default()), vec![issue])
            }
        }
    }
}
