//! Synthetic reliability benchmark
//!
//! A seeded noisy generator fails in three ways: unparseable output, plans
//! missing details, and unrealistic estimates. Each task is answered once by
//! a single raw call and once by a consensus step with validation and red
//! flags, and the two are compared.

use forge_application::{Erased, EventSink, FnGenerator, GeneratorError, Step, StepError};
use forge_domain::{
    ConsensusStrategy, JsonSchema, RedFlagRule, Schema, SchemaIssue, StepEvent, StrategyOverrides,
    Validate,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::ops::AddAssign;
use std::sync::Mutex;
use tracing::{debug, info};

pub const TASKS: [&str; 8] = [
    "Generate Hello World React app",
    "Create onboarding email flow",
    "Draft REST API spec for a todo service",
    "Outline unit tests for a math library",
    "Propose schema for a blog engine",
    "Draft Slack bot MVP milestones",
    "Design feature flags rollout plan",
    "Summarize observability setup for bun + hono",
];

/// Deterministic 32-bit PRNG (mulberry32)
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / 4_294_967_296.0
    }
}

/// One raw answer of the noisy model
pub fn noisy_model(task: &str, rng: &mut Mulberry32) -> Value {
    let roll = rng.next_f64();
    if roll < 0.18 {
        return Value::String(format!("not-json: {}", task));
    }
    if roll < 0.42 {
        return json!({ "title": task, "steps": ["hello"], "estimateHours": -1 });
    }
    let quality = rng.next_f64();
    let steps = if quality < 0.3 {
        vec!["skip integration".to_string()]
    } else {
        vec![
            format!("setup {}", task),
            "wire UI".to_string(),
            "ship".to_string(),
        ]
    };
    json!({
        "title": format!("{} plan", task),
        "steps": steps,
        "estimateHours": (quality * 150.0).round() as i64,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub task: String,
    pub seed: u32,
}

impl Validate for PlanRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub title: String,
    pub steps: Vec<String>,
    pub estimate_hours: i64,
}

impl Validate for Plan {
    fn validate(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();
        if self.title.chars().count() < 3 {
            issues.push(SchemaIssue::new("title", "must be at least 3 characters"));
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.chars().count() < 5 {
                issues.push(SchemaIssue::new(
                    format!("steps.{}", i),
                    "must be at least 5 characters",
                ));
            }
        }
        if self.steps.len() < 2 {
            issues.push(SchemaIssue::new("steps", "must contain at least 2 items"));
        }
        if !(1..=120).contains(&self.estimate_hours) {
            issues.push(SchemaIssue::new("estimateHours", "must be between 1 and 120"));
        }
        issues
    }
}

/// Counters for one side of the comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    /// Tasks that ended with a valid plan
    pub valid: usize,
    /// Samples rejected by validation
    pub invalid: usize,
    /// Validation issues across all rejected samples
    pub invalid_details: usize,
    /// Samples discarded by a red flag
    pub red_flags: usize,
    /// Every attempt evaluated: accepted, invalid or red-flagged
    pub attempts: usize,
    /// Tasks that ended without any valid plan
    pub failed: usize,
}

impl Metrics {
    pub fn valid_percent(&self) -> f64 {
        let total = self.valid + self.invalid;
        self.valid as f64 / total.max(1) as f64 * 100.0
    }

    pub fn avg_invalid_details(&self) -> f64 {
        self.invalid_details as f64 / self.invalid.max(1) as f64
    }

    /// Fold one step event into the counters
    fn observe<O>(&mut self, event: &StepEvent<O>) {
        match event {
            StepEvent::InvalidSample { .. } => {
                self.invalid += 1;
                self.invalid_details += 1;
                self.attempts += 1;
            }
            StepEvent::Sample { .. } => self.attempts += 1,
            StepEvent::RedFlag { .. } => {
                self.red_flags += 1;
                self.attempts += 1;
            }
            _ => {}
        }
    }
}

impl AddAssign for Metrics {
    fn add_assign(&mut self, other: Self) {
        self.valid += other.valid;
        self.invalid += other.invalid;
        self.invalid_details += other.invalid_details;
        self.red_flags += other.red_flags;
        self.attempts += other.attempts;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub tasks: usize,
    pub iterations: u32,
    pub seed: u32,
    pub baseline: Metrics,
    pub consensus: Metrics,
}

fn task_seed(seed: u32, round: u32, index: usize) -> u32 {
    seed.wrapping_add(round)
        .wrapping_mul(100)
        .wrapping_add(index as u32)
}

/// Strategy used for the consensus side before config overrides
pub fn default_strategy() -> ConsensusStrategy {
    ConsensusStrategy::new(2).with_k(1).with_max_samples(6)
}

/// Build the consensus plan step
///
/// Each task seed owns its own random stream, so repeated samples of one
/// task differ while runs stay reproducible. Streams live as long as the
/// step and are never evicted, so build one step per batch of tasks.
pub fn plan_step(strategy: ConsensusStrategy) -> Step<PlanRequest, Plan> {
    let streams: Mutex<HashMap<u32, Mulberry32>> = Mutex::new(HashMap::new());

    Step::json(
        "plan",
        FnGenerator::new(move |request: &PlanRequest| {
            let raw = {
                let mut streams = streams
                    .lock()
                    .map_err(|_| GeneratorError::failed("random stream lock poisoned"))?;
                let rng = streams
                    .entry(request.seed)
                    .or_insert_with(|| Mulberry32::new(request.seed));
                noisy_model(&request.task, rng)
            };
            match raw {
                Value::String(text) => serde_json::from_str::<Value>(&text)
                    .map_err(|e| GeneratorError::Output(e.to_string())),
                other => Ok(other),
            }
        }),
    )
    .with_strategy(strategy)
    .with_red_flag(RedFlagRule::new("Too few steps", |plan: &Plan| {
        plan.steps.len() < 3
    }))
    .with_red_flag(RedFlagRule::new("Unreasonable estimate", |plan: &Plan| {
        !(1..=120).contains(&plan.estimate_hours)
    }))
}

/// One raw call per task, validated but never retried
pub fn run_baseline(seed: u32, iterations: u32) -> Metrics {
    let schema = JsonSchema::<Plan>::new();
    let mut metrics = Metrics::default();

    for round in 0..iterations {
        for (index, task) in TASKS.iter().enumerate() {
            let mut rng = Mulberry32::new(task_seed(seed, round, index));
            let raw = match noisy_model(task, &mut rng) {
                Value::String(text) => serde_json::from_str(&text)
                    .unwrap_or_else(|e| json!({ "error": e.to_string(), "raw": text })),
                other => other,
            };
            metrics.attempts += 1;
            match schema.validate(raw) {
                Ok(_) => metrics.valid += 1,
                Err(err) => {
                    metrics.invalid += 1;
                    metrics.invalid_details += err.issues.len();
                }
            }
        }
    }

    metrics
}

/// Every task through the consensus step, tasks of one round in parallel
pub async fn run_consensus(
    seed: u32,
    iterations: u32,
    strategy: ConsensusStrategy,
    observer: &dyn EventSink<StepEvent<Value>>,
) -> Result<Metrics, StepError> {
    let mut metrics = Metrics::default();

    for round in 0..iterations {
        // Seeds never repeat across rounds, so each round starts with no streams
        let step = plan_step(strategy);
        let runs = TASKS.iter().enumerate().map(|(index, task)| {
            let step = &step;
            async move {
                let local = Mutex::new(Metrics::default());
                let erased = Erased::new(step.name(), observer);
                let sink = |event: StepEvent<Plan>| {
                    if let Ok(mut m) = local.lock() {
                        m.observe(&event);
                    }
                    erased.emit(event);
                };
                let input = json!({ "task": task, "seed": task_seed(seed, round, index) });
                let result = step.execute_with_events(input, &sink).await;
                let mut task_metrics = local.into_inner().unwrap_or_else(|p| p.into_inner());
                match &result {
                    Ok(_) => task_metrics.valid += 1,
                    Err(StepError::NoValidSamples { .. }) => task_metrics.failed += 1,
                    Err(_) => {}
                }
                (result, task_metrics)
            }
        });
        for (result, task_metrics) in futures::future::join_all(runs).await {
            match result {
                Ok(_) => {}
                Err(StepError::NoValidSamples { step, attempts }) => {
                    debug!("{} gave up after {} attempts", step, attempts);
                }
                Err(other) => return Err(other),
            }
            metrics += task_metrics;
        }
    }

    Ok(metrics)
}

/// Run both sides and collect the report
pub async fn run(
    seed: u32,
    iterations: u32,
    overrides: &StrategyOverrides,
    observer: &dyn EventSink<StepEvent<Value>>,
) -> Result<BenchReport, StepError> {
    let strategy = default_strategy().merge(overrides);
    info!(
        "Benchmark: {} tasks x {} rounds, seed {}",
        TASKS.len(),
        iterations,
        seed
    );

    let baseline = run_baseline(seed, iterations);
    let consensus = run_consensus(seed, iterations, strategy, observer).await?;

    Ok(BenchReport {
        tasks: TASKS.len(),
        iterations,
        seed,
        baseline,
        consensus,
    })
}
