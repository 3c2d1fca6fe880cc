//! Testing utilities and mock implementations
//!
//! Mocks for the LLM provider and pipeline runner seams, so the service can
//! be tested without network access.

pub mod mocks;

pub use mocks::*;
