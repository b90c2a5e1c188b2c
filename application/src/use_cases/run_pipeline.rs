//! Run Pipeline use case
//!
//! A [`Pipeline`] threads one state value through an ordered list of steps.
//! Each stage projects the state into its step's input, runs the step, and
//! folds the winning output back into the state. Stages with a false
//! condition are skipped without a trace.

use crate::ports::event_sink::{Erased, EventSink, NoEvents};
use crate::use_cases::run_step::{Step, StepError};
use async_trait::async_trait;
use forge_domain::{PipelineEvent, StepEvent};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

type InputFn<S> = Box<dyn Fn(&S) -> Value + Send + Sync>;
type ApplyFn<S, O> = Box<dyn Fn(S, O) -> S + Send + Sync>;
type ConditionFn<S> = Box<dyn Fn(&S) -> bool + Send + Sync>;

/// How a stage reads from and writes back to the pipeline state
pub struct Transition<S, O> {
    input: InputFn<S>,
    apply: ApplyFn<S, O>,
    condition: Option<ConditionFn<S>>,
}

impl<S, O> Transition<S, O> {
    /// `input` maps the state to the step's raw input; `apply` folds the
    /// step's output into the next state.
    pub fn new(
        input: impl Fn(&S) -> Value + Send + Sync + 'static,
        apply: impl Fn(S, O) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            input: Box::new(input),
            apply: Box::new(apply),
            condition: None,
        }
    }

    /// Only run the stage when `condition` holds for the current state.
    pub fn when(mut self, condition: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    fn should_run(&self, state: &S) -> bool {
        self.condition.as_ref().is_none_or(|condition| condition(state))
    }
}

/// Type-erased stage so steps with different input/output types can share
/// one pipeline
#[async_trait]
trait Stage<S>: Send + Sync {
    fn name(&self) -> &str;

    fn should_run(&self, state: &S) -> bool;

    async fn advance(
        &self,
        state: S,
        events: &dyn EventSink<StepEvent<Value>>,
    ) -> Result<S, StepError>;
}

struct BoundStage<S, I, O> {
    step: Arc<Step<I, O>>,
    transition: Transition<S, O>,
}

#[async_trait]
impl<S, I, O> Stage<S> for BoundStage<S, I, O>
where
    S: Send + Sync + 'static,
    I: Send + Sync + 'static,
    O: Clone + Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.step.name()
    }

    fn should_run(&self, state: &S) -> bool {
        self.transition.should_run(state)
    }

    async fn advance(
        &self,
        state: S,
        events: &dyn EventSink<StepEvent<Value>>,
    ) -> Result<S, StepError> {
        let input = (self.transition.input)(&state);
        let erased = Erased::new(self.step.name(), events);
        let outcome = self.step.execute_with_events(input, &erased).await?;
        Ok((self.transition.apply)(state, outcome.output))
    }
}

/// Ordered, conditionally-branching sequence of steps
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::new()
///     .step(increment, Transition::new(
///         |s: &State| json!({ "count": s.count }),
///         |s, out: Count| State { count: out.count, ..s },
///     ))
///     .step(log, Transition::new(
///         |s: &State| json!({ "count": s.count, "log": s.log }),
///         |s, out: Log| State { log: out.log, ..s },
///     ).when(|s| s.count > 0));
///
/// let final_state = pipeline.run(State::default()).await?;
/// ```
pub struct Pipeline<S> {
    stages: Vec<Box<dyn Stage<S>>>,
}

impl<S> Default for Pipeline<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Pipeline<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage. The stage is named after its step.
    pub fn step<I, O>(
        mut self,
        step: impl Into<Arc<Step<I, O>>>,
        transition: Transition<S, O>,
    ) -> Self
    where
        I: Send + Sync + 'static,
        O: Clone + Serialize + Send + Sync + 'static,
    {
        self.stages.push(Box::new(BoundStage {
            step: step.into(),
            transition,
        }));
        self
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run without observing events
    pub async fn run(&self, initial_state: S) -> Result<S, StepError> {
        self.run_with_events(initial_state, &NoEvents).await
    }

    /// Run, reporting every stage transition and every wrapped step event
    ///
    /// A failing stage aborts the run: its error is returned unchanged and
    /// no later stage executes.
    pub async fn run_with_events(
        &self,
        initial_state: S,
        events: &dyn EventSink<PipelineEvent<S>>,
    ) -> Result<S, StepError> {
        info!("Starting pipeline with {} stages", self.stages.len());
        let mut state = initial_state;
        events.emit(PipelineEvent::PipelineStart {
            state: state.clone(),
        });

        for stage in &self.stages {
            let name = stage.name();
            if !stage.should_run(&state) {
                debug!("Skipping stage {}: condition not met", name);
                continue;
            }

            info!("Stage {}", name);
            events.emit(PipelineEvent::StepStart {
                step: name.to_string(),
                state: state.clone(),
            });

            let wrap = |event: StepEvent<Value>| {
                events.emit(PipelineEvent::StepEvent {
                    step: name.to_string(),
                    event,
                })
            };
            state = stage.advance(state, &wrap).await?;

            events.emit(PipelineEvent::StepEnd {
                step: name.to_string(),
                state: state.clone(),
            });
        }

        events.emit(PipelineEvent::PipelineEnd {
            state: state.clone(),
        });
        info!("Pipeline complete");
        Ok(state)
    }
}
