//! Agent runtime backed by an LLM provider
//!
//! Turns a task descriptor (plus the previous stage's output) into a chat
//! completion request for the agent's model.

use crate::llm::{CompletionRequest, LlmProvider, Message};
use crate::llm_span;
use crate::screening::pipeline::{AgentRuntime, PipelineError, StageOutput};
use crate::screening::tasks::TaskDescriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, Instrument};

/// Sampling parameters applied to every stage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

pub struct LlmAgentRuntime {
    provider: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl LlmAgentRuntime {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    /// Build the user prompt for a task (pure function)
    pub fn task_prompt(task: &TaskDescriptor, context: Option<&StageOutput>) -> String {
        let mut prompt = format!(
            "Current Task: {}\n\nOrder details:\n{}\n",
            task.description, task.order_context
        );

        if let Some(previous) = context {
            prompt.push_str(&format!(
                "\nThis is the context you're working with, produced by the {}:\n{}\n",
                previous.agent_role, previous.text
            ));
        }

        prompt.push_str(&format!(
            "\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer.",
            task.expected_output
        ));
        prompt
    }

    fn build_request(&self, task: &TaskDescriptor, context: Option<&StageOutput>) -> CompletionRequest {
        let mut metadata = HashMap::new();
        metadata.insert("stage".to_string(), task.stage.to_string());
        metadata.insert("agent_role".to_string(), task.agent.role.clone());

        CompletionRequest {
            messages: vec![
                Message::system(task.agent.system_prompt()),
                Message::user(Self::task_prompt(task, context)),
            ],
            model: task.agent.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            metadata,
        }
    }
}

#[async_trait]
impl AgentRuntime for LlmAgentRuntime {
    async fn execute(
        &self,
        task: &TaskDescriptor,
        context: Option<&StageOutput>,
    ) -> Result<StageOutput, PipelineError> {
        let request = self.build_request(task, context);
        let span = llm_span!(provider = self.provider.name(), model = %request.model);

        let response = self
            .provider
            .complete(request)
            .instrument(span)
            .await
            .map_err(|source| PipelineError::StageFailed {
                stage: task.stage,
                source,
            })?;

        debug!(
            stage = %task.stage,
            finish_reason = ?response.finish_reason,
            total_tokens = response.usage.total_tokens,
            "Provider completed stage"
        );

        Ok(StageOutput {
            stage: task.stage,
            agent_role: task.agent.role.clone(),
            text: response.content.unwrap_or_default(),
            usage: response.usage,
        })
    }
}
