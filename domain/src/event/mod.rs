//! Step and pipeline events
//!
//! Every internal decision of a consensus step, and every stage transition of
//! a pipeline, is reported as one event. Events serialize as
//! `{"type": "<kind>", ...fields}` so streaming consumers can dispatch on
//! `type`.
//!
//! # Ordering
//!
//! For one `execute` call the step emits, in order:
//!
//! ```text
//! step_start
//! prompt?                              (only when a prompt formatter is set)
//! ( invalid_sample
//! | red_flag
//! | sample vote_update )*              (one group per attempt)
//! step_decided                         (only on success)
//! ```
//!
//! For one `run` call the pipeline emits:
//!
//! ```text
//! pipeline_start
//! ( step_start step_event* step_end )* (skipped stages emit nothing)
//! pipeline_end                         (only on success)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Event emitted by a single consensus step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent<O> {
    StepStart,
    Prompt {
        prompt: String,
    },
    InvalidSample {
        index: usize,
        reason: String,
    },
    Sample {
        index: usize,
        sample: O,
    },
    RedFlag {
        index: usize,
        rule: String,
    },
    VoteUpdate {
        index: usize,
        tally: BTreeMap<String, usize>,
    },
    StepDecided {
        output: O,
        samples: Vec<O>,
    },
}

impl<O> StepEvent<O> {
    /// Wire name of this event's kind
    pub fn kind(&self) -> &'static str {
        match self {
            StepEvent::StepStart => "step_start",
            StepEvent::Prompt { .. } => "prompt",
            StepEvent::InvalidSample { .. } => "invalid_sample",
            StepEvent::Sample { .. } => "sample",
            StepEvent::RedFlag { .. } => "red_flag",
            StepEvent::VoteUpdate { .. } => "vote_update",
            StepEvent::StepDecided { .. } => "step_decided",
        }
    }

    /// Attempt index, for events tied to one attempt
    pub fn index(&self) -> Option<usize> {
        match self {
            StepEvent::InvalidSample { index, .. }
            | StepEvent::Sample { index, .. }
            | StepEvent::RedFlag { index, .. }
            | StepEvent::VoteUpdate { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Transform the sample payloads, keeping everything else.
    pub fn map<P>(self, mut f: impl FnMut(O) -> P) -> StepEvent<P> {
        match self {
            StepEvent::StepStart => StepEvent::StepStart,
            StepEvent::Prompt { prompt } => StepEvent::Prompt { prompt },
            StepEvent::InvalidSample { index, reason } => StepEvent::InvalidSample { index, reason },
            StepEvent::Sample { index, sample } => StepEvent::Sample {
                index,
                sample: f(sample),
            },
            StepEvent::RedFlag { index, rule } => StepEvent::RedFlag { index, rule },
            StepEvent::VoteUpdate { index, tally } => StepEvent::VoteUpdate { index, tally },
            StepEvent::StepDecided { output, samples } => StepEvent::StepDecided {
                output: f(output),
                samples: samples.into_iter().map(&mut f).collect(),
            },
        }
    }
}

impl<O: Serialize> StepEvent<O> {
    /// Erase the output type to JSON, as carried inside pipeline events.
    ///
    /// Fails when a sample or output payload cannot be serialized.
    pub fn erase(&self) -> Result<StepEvent<Value>, serde_json::Error> {
        Ok(match self {
            StepEvent::StepStart => StepEvent::StepStart,
            StepEvent::Prompt { prompt } => StepEvent::Prompt {
                prompt: prompt.clone(),
            },
            StepEvent::InvalidSample { index, reason } => StepEvent::InvalidSample {
                index: *index,
                reason: reason.clone(),
            },
            StepEvent::Sample { index, sample } => StepEvent::Sample {
                index: *index,
                sample: serde_json::to_value(sample)?,
            },
            StepEvent::RedFlag { index, rule } => StepEvent::RedFlag {
                index: *index,
                rule: rule.clone(),
            },
            StepEvent::VoteUpdate { index, tally } => StepEvent::VoteUpdate {
                index: *index,
                tally: tally.clone(),
            },
            StepEvent::StepDecided { output, samples } => StepEvent::StepDecided {
                output: serde_json::to_value(output)?,
                samples: samples
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<_, _>>()?,
            },
        })
    }
}

/// Event emitted by a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent<S> {
    PipelineStart {
        state: S,
    },
    StepStart {
        step: String,
        state: S,
    },
    StepEvent {
        step: String,
        event: StepEvent<Value>,
    },
    StepEnd {
        step: String,
        state: S,
    },
    PipelineEnd {
        state: S,
    },
}

impl<S> PipelineEvent<S> {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::PipelineStart { .. } => "pipeline_start",
            PipelineEvent::StepStart { .. } => "step_start",
            PipelineEvent::StepEvent { .. } => "step_event",
            PipelineEvent::StepEnd { .. } => "step_end",
            PipelineEvent::PipelineEnd { .. } => "pipeline_end",
        }
    }

    /// Name of the stage this event belongs to, if any
    pub fn step(&self) -> Option<&str> {
        match self {
            PipelineEvent::StepStart { step, .. }
            | PipelineEvent::StepEvent { step, .. }
            | PipelineEvent::StepEnd { step, .. } => Some(step),
            _ => None,
        }
    }
}
