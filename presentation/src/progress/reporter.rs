//! Progress reporting for pipeline execution

use colored::Colorize;
use forge_application::EventSink;
use forge_domain::{PipelineEvent, StepEvent};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

/// Reports pipeline progress with one spinner per running stage
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} [{pos} samples] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.stage_bar.lock()
            && let Some(pb) = guard.as_ref()
        {
            f(pb);
        }
    }

    fn on_step_event(&self, event: &StepEvent<Value>) {
        match event {
            StepEvent::StepStart => {}
            StepEvent::Prompt { .. } => self.with_bar(|pb| pb.set_message("prompting...")),
            StepEvent::InvalidSample { index, .. } => self.with_bar(|pb| {
                pb.inc(1);
                pb.set_message(format!("{} sample #{} invalid", "x".red(), index));
            }),
            StepEvent::Sample { index, .. } => self.with_bar(|pb| {
                pb.inc(1);
                pb.set_message(format!("{} sample #{}", "v".green(), index));
            }),
            StepEvent::RedFlag { index, rule } => self.with_bar(|pb| {
                pb.set_message(format!("{} sample #{}: {}", "!".yellow(), index, rule));
            }),
            StepEvent::VoteUpdate { tally, .. } => {
                let summary = tally_summary(tally);
                self.with_bar(|pb| pb.set_message(summary));
            }
            StepEvent::StepDecided { samples, .. } => {
                if let Ok(mut guard) = self.stage_bar.lock()
                    && let Some(pb) = guard.take()
                {
                    pb.finish_with_message(format!(
                        "{} after {} accepted samples",
                        "decided".green(),
                        samples.len()
                    ));
                }
            }
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> EventSink<PipelineEvent<S>> for ProgressReporter {
    fn emit(&self, event: PipelineEvent<S>) {
        match &event {
            PipelineEvent::StepStart { step, .. } => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::stage_style());
                pb.set_prefix(step.clone());
                pb.set_message("sampling...");
                pb.enable_steady_tick(Duration::from_millis(100));
                if let Ok(mut guard) = self.stage_bar.lock() {
                    *guard = Some(pb);
                }
            }
            PipelineEvent::StepEvent { event, .. } => self.on_step_event(event),
            PipelineEvent::StepEnd { .. } => {
                // A stage that never decided leaves its spinner behind
                if let Ok(mut guard) = self.stage_bar.lock()
                    && let Some(pb) = guard.take()
                {
                    pb.finish_and_clear();
                }
            }
            PipelineEvent::PipelineStart { .. } | PipelineEvent::PipelineEnd { .. } => {}
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl SimpleProgress {
    fn describe(event: &StepEvent<Value>) -> Option<String> {
        match event {
            StepEvent::StepStart | StepEvent::Prompt { .. } => None,
            StepEvent::InvalidSample { index, reason } => {
                Some(format!("  {} #{} invalid: {}", "x".red(), index, reason))
            }
            StepEvent::Sample { index, .. } => Some(format!("  {} #{}", "v".green(), index)),
            StepEvent::RedFlag { index, rule } => {
                Some(format!("  {} #{} red flag: {}", "!".yellow(), index, rule))
            }
            StepEvent::VoteUpdate { tally, .. } => {
                Some(format!("    votes: {}", tally_summary(tally).dimmed()))
            }
            StepEvent::StepDecided { samples, .. } => Some(format!(
                "  {} after {} accepted samples",
                "decided".green(),
                samples.len()
            )),
        }
    }
}

impl<S> EventSink<PipelineEvent<S>> for SimpleProgress {
    fn emit(&self, event: PipelineEvent<S>) {
        match &event {
            PipelineEvent::StepStart { step, .. } => {
                println!("{} {}", "->".cyan(), step.bold());
            }
            PipelineEvent::StepEvent { event, .. } => {
                if let Some(line) = Self::describe(event) {
                    println!("{}", line);
                }
            }
            PipelineEvent::StepEnd { .. } => println!(),
            PipelineEvent::PipelineStart { .. } | PipelineEvent::PipelineEnd { .. } => {}
        }
    }
}

/// Prints each event as one JSON line on stdout
pub struct EventPrinter;

impl<E: Serialize> EventSink<E> for EventPrinter {
    fn emit(&self, event: E) {
        let Ok(line) = serde_json::to_string(&event) else {
            return;
        };
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
    }
}

/// Render a tally as `count x value` pairs, highest first
fn tally_summary(tally: &BTreeMap<String, usize>) -> String {
    let mut entries: Vec<_> = tally.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    entries
        .iter()
        .map(|(key, count)| format!("{}x {}", count, truncate(key, 40)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}
