//! Console output formatter for pipeline results

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

/// Formats final pipeline states and benchmark tables for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a final state as a readable summary, one section per field
    pub fn format_summary<S: Serialize>(state: &S) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Pipeline Result"));
        output.push('\n');

        match serde_json::to_value(state) {
            Ok(Value::Object(fields)) => {
                for (key, value) in &fields {
                    output.push_str(&Self::field(key, value));
                }
            }
            Ok(other) => {
                output.push_str(&format!("\n{}\n", Self::scalar(&other)));
            }
            Err(e) => {
                output.push_str(&format!("\n{} {}\n", "Unserializable state:".red(), e));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json<S: Serialize>(state: &S) -> String {
        serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format a titled two-column table
    pub fn format_table(title: &str, rows: &[(&str, String)]) -> String {
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let mut output = Self::section_header(title);
        for (label, value) in rows {
            output.push_str(&format!("  {:<width$}  {}\n", label, value.bold()));
        }
        output
    }

    fn field(key: &str, value: &Value) -> String {
        let title = format!("{}:", key).cyan().bold();
        match value {
            Value::Array(items) if items.is_empty() => format!("\n{} {}\n", title, "(none)".dimmed()),
            Value::Array(items) => {
                let mut out = format!("\n{}\n", title);
                for item in items {
                    match item {
                        Value::Object(_) => {
                            let pretty = serde_json::to_string_pretty(item).unwrap_or_default();
                            out.push_str(&format!("  *\n{}\n", Self::indent(&pretty, "    ")));
                        }
                        other => out.push_str(&format!("  * {}\n", Self::scalar(other))),
                    }
                }
                out
            }
            Value::Null => format!("\n{} {}\n", title, "(unset)".dimmed()),
            other => format!("\n{} {}\n", title, Self::scalar(other)),
        }
    }

    fn scalar(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_lists_every_field() {
        let state = json!({
            "prompt": "todo app",
            "plan": ["one", "two"],
            "files": [],
            "summary": null,
        });
        let out = ConsoleFormatter::format_summary(&state);
        assert!(out.contains("prompt"));
        assert!(out.contains("todo app"));
        assert!(out.contains("* one"));
        assert!(out.contains("* two"));
        assert!(out.contains("(none)"));
        assert!(out.contains("(unset)"));
    }

    #[test]
    fn test_summary_of_scalar_state() {
        let out = ConsoleFormatter::format_summary(&42);
        assert!(out.contains("42"));
    }

    #[test]
    fn test_json_round_trips() {
        let state = json!({"count": 1, "log": ["count=1"]});
        let out = ConsoleFormatter::format_json(&state);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_table_contains_rows() {
        let out = ConsoleFormatter::format_table(
            "Raw model calls",
            &[("Valid outputs", "3".to_string()), ("Samples", "8".to_string())],
        );
        assert!(out.contains("Raw model calls"));
        assert!(out.contains("Valid outputs"));
        assert!(out.contains('8'));
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
