//! LLM provider abstraction layer
//!
//! Provider-agnostic interface used by the agent runtime, with OpenAI and
//! Anthropic backends.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
