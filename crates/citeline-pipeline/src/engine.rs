//! Pipeline engine
//!
//! Drives the stage graph: one node at a time, events around every stage,
//! routing after each, the iteration counter bumped exactly once per
//! retry decision, and a defensive step ceiling so a routing defect can
//! never spin forever. An unexpected handler error is caught at the node
//! boundary and ends the run as failed with partial state retained.

use crate::collaborators::Collaborators;
use crate::config::PipelineConfig;
use crate::handlers::StageHandlers;
use crate::router::{self, Transition};
use crate::stage::Stage;
use crate::state::{FinalState, RunState};
use citeline_domain::traits::EventSink;
use citeline_domain::RunInputs;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Stages visited per iteration is bounded by the graph size; anything
/// past this ceiling is a routing defect.
const STEPS_PER_ITERATION: usize = 20;

/// Orchestrates one or more runs over a fixed collaborator set.
pub struct PipelineEngine {
    config: Arc<PipelineConfig>,
    handlers: StageHandlers,
    events: Arc<dyn EventSink>,
}

impl PipelineEngine {
    /// Build an engine from configuration and collaborators.
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        let config = Arc::new(config);
        let events = Arc::clone(&collaborators.events);
        let handlers = StageHandlers::new(Arc::clone(&config), collaborators);
        Self { config, handlers, events }
    }

    /// Engine with default configuration and deterministic collaborators.
    pub fn mock() -> Self {
        Self::new(PipelineConfig::default(), Collaborators::mock())
    }

    /// Engine that picks mock or live collaborators from the config.
    pub fn from_config(config: PipelineConfig) -> Self {
        let collaborators =
            if config.mock_mode { Collaborators::mock() } else { Collaborators::live(&config) };
        Self::new(config, collaborators)
    }

    /// Execute a full run to its terminal state.
    pub async fn run(&self, inputs: RunInputs) -> FinalState {
        let mut state = RunState::new(inputs, self.config.max_iterations);
        let mut stage = Stage::Outline;
        let step_ceiling = STEPS_PER_ITERATION * (self.config.max_iterations as usize + 2);
        let mut steps = 0usize;
        let mut failed = false;

        loop {
            steps += 1;
            if steps > step_ceiling {
                error!(stage = stage.name(), steps, "step ceiling exceeded");
                state.errors.push(format!(
                    "Step ceiling exceeded at stage {}; run aborted.",
                    stage.name()
                ));
                failed = true;
                break;
            }

            self.events.emit(
                stage.name(),
                "stage started",
                Some(json!({ "iteration": state.iteration, "step": steps })),
            );
            match self.handlers.execute(stage, &state).await {
                Ok(update) => state.apply(update),
                Err(e) => {
                    error!(stage = stage.name(), error = %e, "node failed");
                    state.errors.push(format!("Stage {} failed: {}", stage.name(), e));
                    failed = true;
                    break;
                }
            }
            self.events.emit(
                stage.name(),
                "stage completed",
                Some(json!({
                    "iteration": state.iteration,
                    "errors": state.errors.len(),
                    "warnings": state.warnings.len(),
                })),
            );

            match router::decide(stage, &state) {
                Transition::Forward(next) => stage = next,
                Transition::Retry(entry) => {
                    state.iteration += 1;
                    info!(
                        entry = entry.name(),
                        iteration = state.iteration,
                        "gate failed, retrying"
                    );
                    stage = entry;
                }
                Transition::Complete => break,
                Transition::Exhausted => {
                    info!(iteration = state.iteration, "iteration budget exhausted");
                    state
                        .errors
                        .push("Iteration budget exhausted with unresolved issues.".to_string());
                    failed = true;
                    break;
                }
            }
        }

        let final_state = FinalState::seal(state, failed);
        self.events.emit(
            "run",
            "run finished",
            Some(json!({ "status": format!("{:?}", final_state.status) })),
        );
        final_state
    }
}
