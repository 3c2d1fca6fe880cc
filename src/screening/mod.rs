//! Order screening domain: schema, agents, tasks and the two-stage pipeline.

pub mod agents;
pub mod order;
pub mod pipeline;
pub mod runtime;
pub mod tasks;

pub use agents::{AgentDescriptor, AgentRegistry};
pub use order::Order;
pub use pipeline::{
    AgentRuntime, PipelineError, PipelineResult, PipelineRunner, ReportMode, SequentialPipeline,
    Stage, StageOutput,
};
pub use runtime::{GenerationSettings, LlmAgentRuntime};
pub use tasks::{build_screening_tasks, TaskDescriptor};
