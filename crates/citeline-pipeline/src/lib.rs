//! Citeline Pipeline Orchestrator
//!
//! The workflow state machine behind cited-report generation: a fixed
//! stage graph with conditional routing, a bounded retry budget, and
//! deterministic fallbacks for every text-generation stage.
//!
//! ## Shape of a run
//!
//! ```text
//! outline → plan → retrieve → gate-sources → resolve → gate-consensus
//!   → status-check → extract-evidence → gate-evidence-coverage → draft
//!   → gate-citations → {normalize-citations} → compose → gate-quality
//!   → {refine} → terminal
//! ```
//!
//! Every gate failure either takes a structural remediation
//! (normalize-citations), consumes one iteration and re-enters an earlier
//! stage, or, once the budget is spent, forces the terminal state with
//! all accumulated issues as the run's errors.
//!
//! ## Entry point
//!
//! ```
//! use citeline_domain::RunInputs;
//! use citeline_pipeline::PipelineEngine;
//!
//! # tokio_test::block_on(async {
//! let engine = PipelineEngine::mock();
//! let result = engine.run(RunInputs::from_prompt("survey automated citation checking")).await;
//! assert!(result.composed_text.is_some());
//! # });
//! ```

#![warn(missing_docs)]

pub mod collaborators;
pub mod compose;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod parse;
pub mod registry;
pub mod router;
pub mod stage;
pub mod state;

pub use collaborators::Collaborators;
pub use config::{CitationAuditMode, PipelineConfig};
pub use engine::PipelineEngine;
pub use handlers::{StageError, StageHandlers};
pub use parse::Parsed;
pub use registry::{RegistryError, RunEntry, RunRegistry};
pub use router::Transition;
pub use stage::Stage;
pub use state::{ChapterPlan, FinalState, RunState, RunStatus, StageUpdate};
