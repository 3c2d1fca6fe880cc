//! Compliance Screener
//!
//! An HTTP service that screens commercial orders with a two-stage LLM
//! pipeline: a compliance analyst checks the order against sanctions and
//! trade-risk heuristics, then an ethics auditor reviews that analysis and
//! writes the final report.
//!
//! # Quick Start
//!
//! ```rust
//! use compliance_screener::screening::{build_screening_tasks, AgentRegistry, Order, Stage};
//!
//! let order = Order::from_slice(
//!     br#"{"order_id":"A-1","customer_name":"Acme","country":"US",
//!          "amount":1500.0,"product_type":"electronics"}"#,
//! )
//! .unwrap();
//!
//! let registry = AgentRegistry::new("gpt-4o");
//! let tasks = build_screening_tasks(&order, &registry);
//! assert_eq!(tasks[0].stage, Stage::ComplianceScreening);
//! assert_eq!(tasks[1].stage, Stage::EthicsAudit);
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod screening;
pub mod server;
pub mod testing;

pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorResponse, ScreeningError, ScreeningResult};
pub use screening::{AgentRegistry, Order, PipelineRunner, SequentialPipeline};
pub use server::{routes, serve, AppState};
