//! Run Step use case
//!
//! A [`Step`] samples its generator until one answer is confidently ahead,
//! validating and red-flag filtering every sample before it may vote.

use crate::ports::event_sink::{EventSink, NoEvents};
use crate::ports::generator::{Generator, GeneratorError};
use forge_domain::{
    ConsensusStrategy, JsonSchema, RedFlagRule, RedFlags, Schema, SchemaError, StepEvent,
    Validate, VoteTally, canonical_key,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal errors of a step execution
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Step {step}: input validation failed: {source}")]
    InputValidation { step: String, source: SchemaError },

    #[error("Step {step} produced no valid samples after {attempts} attempts")]
    NoValidSamples { step: String, attempts: usize },
}

impl StepError {
    /// Name of the step that failed
    pub fn step(&self) -> &str {
        match self {
            StepError::InputValidation { step, .. } | StepError::NoValidSamples { step, .. } => {
                step
            }
        }
    }
}

/// Why a single attempt was discarded before voting
///
/// Recovered inside the step and reported as an `invalid_sample` event.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Sample could not be canonicalized: {0}")]
    Canonicalize(String),
}

/// Result of a successful step execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome<O> {
    /// Winning output
    pub output: O,
    /// Every accepted sample, in acceptance order
    pub samples: Vec<O>,
}

type PromptFormatter<I> = Arc<dyn Fn(&I) -> String + Send + Sync>;

/// Consensus sampling step
///
/// Immutable once built; one `Step` may serve any number of concurrent
/// executions because all voting state lives inside `execute`.
pub struct Step<I, O> {
    name: String,
    input: Arc<dyn Schema<I>>,
    output: Arc<dyn Schema<O>>,
    generator: Arc<dyn Generator<I>>,
    strategy: ConsensusStrategy,
    red_flags: RedFlags<O>,
    prompt: Option<PromptFormatter<I>>,
}

impl<I, O> Step<I, O>
where
    I: Send + Sync + 'static,
    O: Clone + Serialize + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        input: impl Schema<I> + 'static,
        output: impl Schema<O> + 'static,
        generator: impl Generator<I> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            input: Arc::new(input),
            output: Arc::new(output),
            generator: Arc::new(generator),
            strategy: ConsensusStrategy::default(),
            red_flags: RedFlags::new(),
            prompt: None,
        }
    }

    /// Step whose input and output are validated with [`JsonSchema`].
    pub fn json(name: impl Into<String>, generator: impl Generator<I> + 'static) -> Self
    where
        I: DeserializeOwned + Validate,
        O: DeserializeOwned + Validate,
    {
        Self::new(name, JsonSchema::new(), JsonSchema::new(), generator)
    }

    pub fn with_strategy(mut self, strategy: ConsensusStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_red_flag(mut self, rule: RedFlagRule<O>) -> Self {
        self.red_flags = self.red_flags.with(rule);
        self
    }

    pub fn with_red_flags(mut self, red_flags: RedFlags<O>) -> Self {
        self.red_flags = red_flags;
        self
    }

    /// Set the prompt formatter; its result is reported as a `prompt` event.
    pub fn with_prompt(mut self, prompt: impl Fn(&I) -> String + Send + Sync + 'static) -> Self {
        self.prompt = Some(Arc::new(prompt));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &ConsensusStrategy {
        &self.strategy
    }

    pub fn red_flags(&self) -> &RedFlags<O> {
        &self.red_flags
    }

    /// Execute without observing events
    pub async fn execute(&self, raw_input: Value) -> Result<StepOutcome<O>, StepError> {
        self.execute_with_events(raw_input, &NoEvents).await
    }

    /// Execute, reporting every decision to `events`
    ///
    /// Event order per call: `step_start`, optional `prompt`, then for each
    /// attempt either `invalid_sample`, `red_flag`, or `sample` followed by
    /// `vote_update`, and finally `step_decided`. Input validation failures
    /// emit nothing.
    pub async fn execute_with_events(
        &self,
        raw_input: Value,
        events: &dyn EventSink<StepEvent<O>>,
    ) -> Result<StepOutcome<O>, StepError> {
        let input = self
            .input
            .validate(raw_input)
            .map_err(|source| StepError::InputValidation {
                step: self.name.clone(),
                source,
            })?;

        let bounds = self.strategy.bounds();
        info!(
            "Starting step {} (initial={}, k={}, max={})",
            self.name, bounds.initial, bounds.k, bounds.max
        );
        events.emit(StepEvent::StepStart);

        if let Some(prompt) = &self.prompt {
            events.emit(StepEvent::Prompt {
                prompt: prompt(&input),
            });
        }

        let mut samples: Vec<O> = Vec::new();
        let mut tally: VoteTally<O> = VoteTally::new();
        let mut attempts = 0;
        let mut stopped_early = false;

        for index in 0..bounds.max {
            attempts += 1;

            let (sample, key) = match self.draw(&input).await {
                Ok(drawn) => drawn,
                Err(e) => {
                    debug!("Step {} attempt {} invalid: {}", self.name, index, e);
                    events.emit(StepEvent::InvalidSample {
                        index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if let Some(rule) = self.red_flags.first_match(&sample) {
                debug!("Step {} attempt {} red-flagged: {}", self.name, index, rule);
                events.emit(StepEvent::RedFlag {
                    index,
                    rule: rule.to_string(),
                });
                continue;
            }

            samples.push(sample.clone());
            events.emit(StepEvent::Sample {
                index,
                sample: sample.clone(),
            });

            let count = tally.record(key, sample);
            events.emit(StepEvent::VoteUpdate {
                index,
                tally: tally.counts(),
            });

            let margin = tally.leaders().margin();
            debug!(
                "Step {} attempt {} accepted (count={}, margin={})",
                self.name, index, count, margin
            );

            if bounds.should_stop(index, margin) {
                stopped_early = true;
                break;
            }
        }

        let distinct = tally.len();
        let Some(output) = tally.into_winner() else {
            warn!(
                "Step {} produced no valid samples in {} attempts",
                self.name, attempts
            );
            return Err(StepError::NoValidSamples {
                step: self.name.clone(),
                attempts,
            });
        };

        if !stopped_early {
            debug!(
                "Step {} exhausted {} attempts without reaching margin {}",
                self.name, bounds.max, bounds.k
            );
        }
        info!(
            "Step {} decided after {} attempts ({} accepted, {} distinct)",
            self.name,
            attempts,
            samples.len(),
            distinct
        );

        events.emit(StepEvent::StepDecided {
            output: output.clone(),
            samples: samples.clone(),
        });

        Ok(StepOutcome { output, samples })
    }

    /// One attempt: generate, validate, and compute the tally key.
    async fn draw(&self, input: &I) -> Result<(O, String), SampleError> {
        let raw = self.generator.generate(input).await?;
        let sample = self.output.validate(raw)?;
        let key = canonical_key(&sample).map_err(|e| SampleError::Canonicalize(e.to_string()))?;
        Ok((sample, key))
    }
}

impl<I, O> fmt::Debug for Step<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("red_flags", &self.red_flags.len())
            .field("prompt", &self.prompt.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::event_sink::EventLog;
    use crate::ports::generator::FnGenerator;
    use async_trait::async_trait;
    use forge_domain::SchemaIssue;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ==================== Test Fixtures ====================

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Text {
        text: String,
    }

    impl Validate for Text {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Unit {
        unit: String,
    }

    impl Validate for Unit {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        value: i64,
    }

    impl Validate for Reading {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Empty {}

    impl Validate for Empty {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Flag {
        ok: bool,
    }

    impl Validate for Flag {}

    /// Generator replaying a fixed script of raw outputs
    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<Value, GeneratorError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<Value, GeneratorError>>) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from(responses)),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl<I: Send + Sync> Generator<I> for Arc<ScriptedGenerator> {
        async fn generate(&self, _input: &I) -> Result<Value, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GeneratorError::failed("No more responses")))
        }
    }

    fn kinds<O>(events: &[StepEvent<O>]) -> Vec<&'static str> {
        events.iter().map(StepEvent::kind).collect()
    }

    // ==================== Scenarios ====================

    #[tokio::test]
    async fn test_echo_single_sample() {
        let step: Step<Text, Text> = Step::json(
            "echo",
            FnGenerator::new(|input: &Text| Ok::<_, GeneratorError>(input.clone())),
        );

        let log = EventLog::new();
        let outcome = step
            .execute_with_events(json!({"text": "hi"}), &log)
            .await
            .unwrap();

        assert_eq!(outcome.output, Text { text: "hi".into() });
        assert_eq!(outcome.samples.len(), 1);
        assert_eq!(
            kinds(&log.take()),
            vec!["step_start", "sample", "vote_update", "step_decided"]
        );
    }

    #[tokio::test]
    async fn test_early_stop_after_two_identical_samples() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"text": "same"})),
            Ok(json!({"text": "same"})),
            Ok(json!({"text": "other"})),
        ]));
        let step: Step<Text, Text> = Step::json("stable", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(2).with_k(1).with_max_samples(3));

        let outcome = step.execute(json!({"text": "x"})).await.unwrap();

        assert_eq!(outcome.samples.len(), 2);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.output.text, "same");
    }

    #[tokio::test]
    async fn test_exhaustion_with_always_matching_red_flag() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"ok": false})),
            Ok(json!({"ok": false})),
            Ok(json!({"ok": false})),
        ]));
        let step: Step<Empty, Flag> = Step::json("always-red-flag", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(1).with_k(1).with_max_samples(2))
            .with_red_flag(RedFlagRule::new("reject all", |_: &Flag| true));

        let log = EventLog::new();
        let err = step.execute_with_events(json!({}), &log).await.unwrap_err();

        assert!(matches!(
            err,
            StepError::NoValidSamples { ref step, attempts: 2 } if step == "always-red-flag"
        ));
        assert!(err.to_string().contains("no valid samples"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(kinds(&log.take()), vec!["step_start", "red_flag", "red_flag"]);
    }

    #[tokio::test]
    async fn test_red_flagged_samples_are_skipped() {
        let counter = AtomicUsize::new(0);
        let step: Step<Unit, Reading> = Step::json(
            "flagged",
            FnGenerator::new(move |_: &Unit| {
                let value = counter.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                Ok::<_, GeneratorError>(Reading { value })
            }),
        )
        .with_strategy(ConsensusStrategy::new(2).with_k(1).with_max_samples(4))
        .with_red_flag(RedFlagRule::new("even values are invalid", |r: &Reading| {
            r.value % 2 == 0
        }));

        let log = EventLog::new();
        let outcome = step
            .execute_with_events(json!({"unit": "m"}), &log)
            .await
            .unwrap();

        assert!(outcome.samples.iter().all(|s| s.value % 2 == 1));
        assert_eq!(outcome.output.value % 2, 1);

        let events = log.take();
        let red_flags: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StepEvent::RedFlag { index, rule } => Some((*index, rule.clone())),
                _ => None,
            })
            .collect();
        assert!(!red_flags.is_empty());
        assert_eq!(red_flags[0], (1, "even values are invalid".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_sample_then_recovery() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"ok": "nope"})),
            Ok(json!({"ok": true})),
        ]));
        let step: Step<Empty, Flag> = Step::json("fragile", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(1).with_max_samples(3));

        let log = EventLog::new();
        let outcome = step.execute_with_events(json!({}), &log).await.unwrap();

        assert!(outcome.output.ok);
        let events = log.take();
        assert_eq!(
            kinds(&events),
            vec![
                "step_start",
                "invalid_sample",
                "sample",
                "vote_update",
                "step_decided"
            ]
        );
        // The invalid attempt still consumed index 0
        assert_eq!(events[2].index(), Some(1));
    }

    #[tokio::test]
    async fn test_generator_error_is_reported_as_invalid_sample() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(GeneratorError::Timeout),
            Ok(json!({"ok": true})),
        ]));
        let step: Step<Empty, Flag> = Step::json("flaky", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(1).with_max_samples(2));

        let log = EventLog::new();
        step.execute_with_events(json!({}), &log).await.unwrap();

        match &log.take()[1] {
            StepEvent::InvalidSample { index, reason } => {
                assert_eq!(*index, 0);
                assert_eq!(reason, "Timeout");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_input_validation_failure_emits_nothing() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let step: Step<Text, Text> = Step::json("strict", Arc::clone(&generator));

        let log = EventLog::new();
        let err = step
            .execute_with_events(json!({"text": 42}), &log)
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::InputValidation { .. }));
        assert_eq!(err.step(), "strict");
        assert!(log.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_event_follows_step_start() {
        let step: Step<Text, Text> = Step::json(
            "prompted",
            FnGenerator::new(|input: &Text| Ok::<_, GeneratorError>(input.clone())),
        )
        .with_prompt(|input: &Text| format!("Repeat: {}", input.text));

        let log = EventLog::new();
        step.execute_with_events(json!({"text": "hello"}), &log)
            .await
            .unwrap();

        let events = log.take();
        assert_eq!(events[0].kind(), "step_start");
        assert_eq!(
            events[1],
            StepEvent::Prompt {
                prompt: "Repeat: hello".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_highest_count_wins_when_margin_never_reached() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"text": "a"})),
            Ok(json!({"text": "b"})),
            Ok(json!({"text": "b"})),
            Ok(json!({"text": "a"})),
            Ok(json!({"text": "b"})),
        ]));
        let step: Step<Empty, Text> = Step::json("scattered", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(2).with_k(3).with_max_samples(5));

        let outcome = step.execute(json!({})).await.unwrap();

        assert_eq!(generator.calls.load(Ordering::SeqCst), 5);
        assert_eq!(outcome.samples.len(), 5);
        assert_eq!(outcome.output.text, "b");
    }

    #[tokio::test]
    async fn test_tie_goes_to_first_accepted_value() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"text": "first"})),
            Ok(json!({"text": "second"})),
        ]));
        let step: Step<Empty, Text> = Step::json("tied", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(2).with_k(1).with_max_samples(2));

        let outcome = step.execute(json!({})).await.unwrap();
        assert_eq!(outcome.output.text, "first");
    }

    #[tokio::test]
    async fn test_vote_update_tracks_counts() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"text": "a"})),
            Ok(json!({"text": "a"})),
        ]));
        let step: Step<Empty, Text> = Step::json("counted", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(2));

        let log = EventLog::new();
        step.execute_with_events(json!({}), &log).await.unwrap();

        let last_tally = log
            .take()
            .into_iter()
            .filter_map(|e| match e {
                StepEvent::VoteUpdate { tally, .. } => Some(tally),
                _ => None,
            })
            .last()
            .unwrap();
        assert_eq!(last_tally.get(r#"{"text":"a"}"#), Some(&2));
    }

    #[tokio::test]
    async fn test_final_tally_accounts_for_every_accepted_sample() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"text": "a"})),
            Ok(json!({"wrong": true})),
            Ok(json!({"text": "b"})),
            Ok(json!({"text": "a"})),
            Ok(json!({"text": "a"})),
        ]));
        let step: Step<Empty, Text> = Step::json("mixed", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(2).with_k(2).with_max_samples(5));

        let log = EventLog::new();
        let outcome = step.execute_with_events(json!({}), &log).await.unwrap();
        let events = log.take();

        let last_tally = events
            .iter()
            .filter_map(|e| match e {
                StepEvent::VoteUpdate { tally, .. } => Some(tally.clone()),
                _ => None,
            })
            .last()
            .unwrap();

        assert_eq!(generator.calls.load(Ordering::SeqCst), 5);
        assert_eq!(outcome.samples.len(), 4);
        assert_eq!(outcome.output.text, "a");
        for sample in &outcome.samples {
            assert!(last_tally.contains_key(&canonical_key(sample).unwrap()));
        }
        assert_eq!(last_tally.values().sum::<usize>(), outcome.samples.len());
        assert_eq!(last_tally.get(r#"{"text":"a"}"#), Some(&3));
        assert_eq!(last_tally.get(r#"{"text":"b"}"#), Some(&1));
        assert_eq!(
            kinds(&events).iter().filter(|k| **k == "invalid_sample").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_executions_keep_separate_tallies() {
        let step: Arc<Step<Text, Text>> = Arc::new(
            Step::json(
                "echo",
                FnGenerator::new(|input: &Text| Ok::<_, GeneratorError>(input.clone())),
            )
            .with_strategy(ConsensusStrategy::new(3).with_k(1)),
        );

        let left_log = EventLog::new();
        let right_log = EventLog::new();
        let (left, right) = tokio::join!(
            step.execute_with_events(json!({"text": "left"}), &left_log),
            step.execute_with_events(json!({"text": "right"}), &right_log),
        );

        let left = left.unwrap();
        let right = right.unwrap();
        assert_eq!(left.output.text, "left");
        assert_eq!(right.output.text, "right");
        assert!(left.samples.iter().all(|s| s.text == "left"));
        assert!(right.samples.iter().all(|s| s.text == "right"));
        assert!(right_log.take().iter().all(|e| match e {
            StepEvent::VoteUpdate { tally, .. } => !tally.contains_key(r#"{"text":"left"}"#),
            _ => true,
        }));
    }

    #[tokio::test]
    async fn test_iterations_never_exceed_max_samples() {
        for max in 1..=4 {
            let generator = Arc::new(ScriptedGenerator::new(
                (0..10).map(|i| Ok(json!({ "value": i }))).collect(),
            ));
            let step: Step<Empty, Reading> = Step::json("bounded", Arc::clone(&generator))
                .with_strategy(ConsensusStrategy::new(1).with_k(5).with_max_samples(max));

            let outcome = step.execute(json!({})).await.unwrap();
            assert_eq!(generator.calls.load(Ordering::SeqCst), max);
            assert_eq!(outcome.samples.len(), max);
        }
    }

    #[tokio::test]
    async fn test_output_constraints_are_enforced() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Hours {
            hours: u32,
        }

        impl Validate for Hours {
            fn validate(&self) -> Vec<SchemaIssue> {
                if self.hours == 0 {
                    vec![SchemaIssue::new("hours", "must be positive")]
                } else {
                    vec![]
                }
            }
        }

        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(json!({"hours": 0})),
            Ok(json!({"hours": 4})),
        ]));
        let step: Step<Empty, Hours> = Step::json("estimate", Arc::clone(&generator))
            .with_strategy(ConsensusStrategy::new(1).with_max_samples(2));

        let log = EventLog::new();
        let outcome = step.execute_with_events(json!({}), &log).await.unwrap();

        assert_eq!(outcome.output.hours, 4);
        // Winner round-trips through the output schema unchanged
        let schema = JsonSchema::<Hours>::new();
        assert_eq!(
            schema
                .validate(serde_json::to_value(&outcome.output).unwrap())
                .unwrap(),
            outcome.output
        );
        match &log.take()[1] {
            StepEvent::InvalidSample { reason, .. } => {
                assert!(reason.contains("hours: must be positive"))
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_step_is_reusable_across_executions() {
        let step: Step<Text, Text> = Step::json(
            "echo",
            FnGenerator::new(|input: &Text| Ok::<_, GeneratorError>(input.clone())),
        );

        let first = step.execute(json!({"text": "one"})).await.unwrap();
        let second = step.execute(json!({"text": "two"})).await.unwrap();
        assert_eq!(first.output.text, "one");
        assert_eq!(second.output.text, "two");
        assert_eq!(second.samples.len(), 1);
    }
}
