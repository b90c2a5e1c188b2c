//! JSONL file writer for step and pipeline events.
//!
//! Each event is serialized as a single JSON line. Object events keep their
//! own fields (including the `type` tag) and gain a `timestamp`; anything
//! else is wrapped as `{"timestamp": .., "data": ..}`.

use forge_application::EventSink;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL event logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlEventLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventLogger {
    /// Create a new logger writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: Value) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        match event {
            Value::Object(mut map) => {
                map.insert("timestamp".to_string(), Value::String(timestamp));
                Value::Object(map)
            }
            other => serde_json::json!({
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl<E: Serialize> EventSink<E> for JsonlEventLogger {
    fn emit(&self, event: E) {
        let value = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(e) => {
                warn!("Dropping unserializable event: {}", e);
                return;
            }
        };

        let Ok(line) = serde_json::to_string(&Self::record(value)) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            // JSONL is append-only; flush each line so a crash keeps the prefix
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlEventLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_domain::{PipelineEvent, StepEvent};
    use std::collections::BTreeMap;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_tagged_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.events.jsonl");
        let logger = JsonlEventLogger::new(&path).unwrap();

        logger.emit(StepEvent::<String>::StepStart);
        logger.emit(StepEvent::Sample {
            index: 0,
            sample: "hi".to_string(),
        });
        logger.emit(StepEvent::<String>::VoteUpdate {
            index: 0,
            tally: BTreeMap::from([("\"hi\"".to_string(), 1)]),
        });
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert!(line.get("type").is_some());
            assert!(line.get("timestamp").is_some());
        }
        assert_eq!(lines[0]["type"], "step_start");
        assert_eq!(lines[1]["sample"], "hi");
        assert_eq!(lines[2]["tally"]["\"hi\""], 1);
    }

    #[test]
    fn test_pipeline_events_keep_step_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/pipeline.jsonl");
        let logger = JsonlEventLogger::new(&path).unwrap();
        assert_eq!(logger.path(), path.as_path());

        logger.emit(PipelineEvent::<u32>::StepStart {
            step: "plan".to_string(),
            state: 7,
        });
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "step_start");
        assert_eq!(lines[0]["step"], "plan");
        assert_eq!(lines[0]["state"], 7);
    }

    #[test]
    fn test_non_object_events_are_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jsonl");
        let logger = JsonlEventLogger::new(&path).unwrap();

        logger.emit("just a string");
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["data"], "just a string");
        assert!(lines[0].get("timestamp").is_some());
    }

    #[test]
    fn test_returns_none_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        assert!(JsonlEventLogger::new(blocker.join("events.jsonl")).is_none());
    }
}
