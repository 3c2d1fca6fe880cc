//! Mock implementations for testing
//!
//! Provides a mock LlmProvider and a recording PipelineRunner so the pipeline
//! and HTTP surface can be exercised without a real inference backend.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::screening::pipeline::{
    PipelineError, PipelineResult, PipelineRunner, Stage, StageOutput,
};
use crate::screening::tasks::TaskDescriptor;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock LLM provider returning canned responses in rotation
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub failure: Option<String>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Every call fails with a network error carrying `message`
    pub fn with_failure(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    pub async fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let metadata = request.metadata.clone();
        self.requests.lock().await.push(request);

        if let Some(message) = &self.failure {
            return Err(LlmError::NetworkError(message.clone()));
        }

        let mut current = self.current_response.lock().await;
        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[*current % self.responses.len()].clone()
        };
        *current += 1;

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
            metadata,
        })
    }
}

/// Pipeline runner that records every invocation
#[derive(Debug, Clone)]
pub struct RecordingPipelineRunner {
    pub invocations: Arc<Mutex<Vec<Vec<TaskDescriptor>>>>,
    outcome: Result<String, String>,
}

impl RecordingPipelineRunner {
    /// Succeeds with `report`
    pub fn succeeding(report: impl Into<String>) -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
            outcome: Ok(report.into()),
        }
    }

    /// Fails with an execution error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
            outcome: Err(message.into()),
        }
    }

    pub async fn invocation_count(&self) -> usize {
        self.invocations.lock().await.len()
    }

    /// Stages of each recorded invocation, in call order
    pub async fn recorded_stages(&self) -> Vec<Vec<Stage>> {
        self.invocations
            .lock()
            .await
            .iter()
            .map(|tasks| tasks.iter().map(|t| t.stage).collect())
            .collect()
    }
}

#[async_trait]
impl PipelineRunner for RecordingPipelineRunner {
    async fn run(&self, tasks: Vec<TaskDescriptor>) -> Result<PipelineResult, PipelineError> {
        let last = tasks.last().map(|t| (t.stage, t.agent.role.clone()));
        self.invocations.lock().await.push(tasks);

        match &self.outcome {
            Ok(report) => Ok(PipelineResult {
                report: report.clone(),
                stages: last
                    .map(|(stage, agent_role)| StageOutput {
                        stage,
                        agent_role,
                        text: report.clone(),
                        usage: TokenUsage::default(),
                    })
                    .into_iter()
                    .collect(),
            }),
            Err(message) => Err(PipelineError::execution(message.clone())),
        }
    }
}
