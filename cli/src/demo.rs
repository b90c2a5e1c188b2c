//! Demo pipeline: plan an app, outline its files, summarize the result.
//!
//! Every handler is synthetic, so the demo runs offline and always agrees
//! with itself. The later stages only run when the earlier ones produced
//! something to work on.

use forge_application::{AsyncFnGenerator, FnGenerator, GeneratorError, Pipeline, Step, Transition};
use forge_domain::{ConsensusStrategy, SchemaIssue, Validate};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// State threaded through the demo pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub prompt: String,
    pub plan: Option<Vec<String>>,
    pub files: Option<Vec<FileSpec>>,
    pub summary: Option<String>,
}

impl AppState {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub prompt: String,
}

impl Validate for PlanInput {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutput {
    pub plan: Vec<String>,
}

impl Validate for PlanOutput {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineInput {
    pub plan: Vec<String>,
}

impl Validate for OutlineInput {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineOutput {
    pub files: Vec<FileSpec>,
}

impl Validate for OutlineOutput {
    fn validate(&self) -> Vec<SchemaIssue> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.path.trim().is_empty())
            .map(|(i, _)| SchemaIssue::new(format!("files.{}.path", i), "must not be empty"))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeInput {
    pub plan: Vec<String>,
    pub files: Vec<FileSpec>,
}

impl Validate for SummarizeInput {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
}

impl Validate for SummaryOutput {}

fn plan_app() -> Step<PlanInput, PlanOutput> {
    Step::json(
        "plan-app",
        AsyncFnGenerator::new(|input: PlanInput| async move {
            Ok::<_, GeneratorError>(PlanOutput {
                plan: vec![
                    format!("Initialize project structure for \"{}\"", input.prompt),
                    "Set up a simple React entrypoint and render Hello World".to_string(),
                ],
            })
        }),
    )
    .with_prompt(|input: &PlanInput| format!("Create a concise React plan for: {}", input.prompt))
}

fn outline_files() -> Step<OutlineInput, OutlineOutput> {
    Step::json(
        "outline-files",
        FnGenerator::new(|_: &OutlineInput| {
            Ok::<_, GeneratorError>(OutlineOutput {
                files: vec![
                    FileSpec {
                        path: "src/main.tsx".to_string(),
                        contents: [
                            "import React from 'react';",
                            "import { createRoot } from 'react-dom/client';",
                            "import './styles.css';",
                            "",
                            "const App = () => <h1>Hello World from Forge!</h1>;",
                            "",
                            "const root = createRoot(document.getElementById('root')!);",
                            "root.render(<App />);",
                        ]
                        .join("\n"),
                    },
                    FileSpec {
                        path: "src/styles.css".to_string(),
                        contents: [
                            "body {",
                            "  font-family: system-ui, sans-serif;",
                            "  display: grid;",
                            "  place-items: center;",
                            "  height: 100vh;",
                            "  margin: 0;",
                            "}",
                        ]
                        .join("\n"),
                    },
                ],
            })
        }),
    )
    .with_prompt(|input: &OutlineInput| {
        format!(
            "Generate files for a React app given the plan: {}",
            input.plan.join(" | ")
        )
    })
}

fn summarize() -> Step<SummarizeInput, SummaryOutput> {
    Step::json(
        "summarize",
        FnGenerator::new(|input: &SummarizeInput| {
            let paths: Vec<_> = input.files.iter().map(|f| f.path.as_str()).collect();
            Ok::<_, GeneratorError>(SummaryOutput {
                summary: [
                    "React Hello World ready!".to_string(),
                    format!("Plan items: {}", input.plan.len()),
                    format!("Generated files: {}", paths.join(", ")),
                ]
                .join("\n"),
            })
        }),
    )
}

/// Build the three-stage demo pipeline, every step sampling with `strategy`
pub fn build_pipeline(strategy: ConsensusStrategy) -> Pipeline<AppState> {
    Pipeline::new()
        .step(
            plan_app().with_strategy(strategy),
            Transition::new(
                |s: &AppState| json!({ "prompt": s.prompt }),
                |s: AppState, out: PlanOutput| AppState {
                    plan: Some(out.plan),
                    ..s
                },
            ),
        )
        .step(
            outline_files().with_strategy(strategy),
            Transition::new(
                |s: &AppState| json!({ "plan": s.plan.clone().unwrap_or_default() }),
                |s: AppState, out: OutlineOutput| AppState {
                    files: Some(out.files),
                    ..s
                },
            )
            .when(|s: &AppState| s.plan.as_ref().is_some_and(|plan| !plan.is_empty())),
        )
        .step(
            summarize().with_strategy(strategy),
            Transition::new(
                |s: &AppState| {
                    json!({
                        "plan": s.plan.clone().unwrap_or_default(),
                        "files": s.files.clone().unwrap_or_default(),
                    })
                },
                |s: AppState, out: SummaryOutput| AppState {
                    summary: Some(out.summary),
                    ..s
                },
            )
            .when(|s: &AppState| s.files.as_ref().is_some_and(|files| !files.is_empty())),
        )
}
