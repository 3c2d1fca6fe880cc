//! Sequential two-stage screening pipeline
//!
//! Stage order is fixed: compliance screening, then ethics audit. The first
//! stage's [`StageOutput`] is passed to the second stage explicitly. Any stage
//! failure aborts the run; there are no retries and no partial results.

use crate::llm::{LlmError, TokenUsage};
use crate::observability::metrics::metrics;
use crate::screening::tasks::TaskDescriptor;
use crate::stage_span;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ComplianceScreening,
    EthicsAudit,
}

impl Stage {
    pub const ORDER: [Stage; 2] = [Stage::ComplianceScreening, Stage::EthicsAudit];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ComplianceScreening => "compliance_screening",
            Stage::EthicsAudit => "ethics_audit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the final report is assembled from stage outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// The audit stage's output alone
    #[default]
    FinalStage,
    /// Every stage's output under a heading naming its agent
    Combined,
}

/// Result of one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub stage: Stage,
    pub agent_role: String,
    pub text: String,
    pub usage: TokenUsage,
}

/// Result of a full pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub report: String,
    pub stages: Vec<StageOutput>,
}

impl PipelineResult {
    pub fn total_tokens(&self) -> u32 {
        self.stages.iter().map(|s| s.usage.total_tokens).sum()
    }
}

/// Pipeline failures
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid task sequence: {0}")]
    InvalidSequence(String),

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("{stage} stage produced no output")]
    EmptyOutput { stage: Stage },

    #[error("{0}")]
    Execution(String),
}

impl PipelineError {
    /// Generic failure carrying only a message
    pub fn execution<S: Into<String>>(message: S) -> Self {
        Self::Execution(message.into())
    }
}

/// Executes a single task against an inference backend
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run `task`, given the previous stage's output when there is one
    async fn execute(
        &self,
        task: &TaskDescriptor,
        context: Option<&StageOutput>,
    ) -> Result<StageOutput, PipelineError>;
}

/// Runs an ordered sequence of task bindings to one result
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run(&self, tasks: Vec<TaskDescriptor>) -> Result<PipelineResult, PipelineError>;
}

/// Reject anything other than exactly the two stages in order
pub fn validate_sequence(tasks: &[TaskDescriptor]) -> Result<(), PipelineError> {
    let stages: Vec<Stage> = tasks.iter().map(|t| t.stage).collect();
    if stages != Stage::ORDER {
        return Err(PipelineError::InvalidSequence(format!(
            "expected stages {:?}, got {:?}",
            Stage::ORDER,
            stages
        )));
    }
    Ok(())
}

/// Assemble the report according to `mode`
pub fn compose_report(mode: ReportMode, outputs: &[StageOutput]) -> String {
    match mode {
        ReportMode::FinalStage => outputs
            .last()
            .map(|output| output.text.clone())
            .unwrap_or_default(),
        ReportMode::Combined => outputs
            .iter()
            .map(|output| format!("## {}\n\n{}", output.agent_role, output.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Runs the stages one after another on a shared agent runtime
pub struct SequentialPipeline {
    runtime: Arc<dyn AgentRuntime>,
    report_mode: ReportMode,
}

impl SequentialPipeline {
    pub fn new(runtime: Arc<dyn AgentRuntime>, report_mode: ReportMode) -> Self {
        Self {
            runtime,
            report_mode,
        }
    }

    pub fn report_mode(&self) -> ReportMode {
        self.report_mode
    }
}

#[async_trait]
impl PipelineRunner for SequentialPipeline {
    async fn run(&self, tasks: Vec<TaskDescriptor>) -> Result<PipelineResult, PipelineError> {
        validate_sequence(&tasks)?;

        let mut outputs: Vec<StageOutput> = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let span = stage_span!(stage = %task.stage, agent = %task.agent.role);
            let context = outputs.last();

            let output = match self.runtime.execute(task, context).instrument(span).await {
                Ok(output) if output.text.trim().is_empty() => {
                    metrics().stage_failed(task.stage);
                    warn!(stage = %task.stage, "Stage returned empty output");
                    return Err(PipelineError::EmptyOutput { stage: task.stage });
                }
                Ok(output) => output,
                Err(e) => {
                    metrics().stage_failed(task.stage);
                    warn!(stage = %task.stage, error = %e, "Stage failed, aborting pipeline");
                    return Err(e);
                }
            };

            metrics().stage_completed(task.stage, output.usage.total_tokens);
            debug!(
                stage = %task.stage,
                tokens = output.usage.total_tokens,
                chars = output.text.len(),
                "Stage completed"
            );
            outputs.push(output);
        }

        let report = compose_report(self.report_mode, &outputs);
        info!(
            stages = outputs.len(),
            report_mode = ?self.report_mode,
            "Pipeline completed"
        );

        Ok(PipelineResult {
            report,
            stages: outputs,
        })
    }
}
