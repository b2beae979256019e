//! Conditional edge decisions
//!
//! The router reads gate outcomes off the run state and applies the
//! transition policy: forward on pass, structural remediation when one
//! exists, a budgeted retry entry otherwise, terminal when the budget is
//! spent. The engine is the only writer of the iteration counter and
//! bumps it exactly once per `Retry` decision.

use crate::stage::Stage;
use crate::state::RunState;
use citeline_gates::{citation_issue_is_structural, classify_quality_route, QualityRoute};

/// Where the run goes after a stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Continue on the forward path (no budget consumed)
    Forward(Stage),
    /// Re-enter an earlier stage; consumes one iteration
    Retry(Stage),
    /// Terminal: the run finished its forward path
    Complete,
    /// Terminal: a gate failed with no budget remaining
    Exhausted,
}

/// Decide the next transition after `stage` has executed.
pub fn decide(stage: Stage, state: &RunState) -> Transition {
    if !stage.is_gate() {
        return match stage.forward_next() {
            Some(next) => Transition::Forward(next),
            None => Transition::Complete,
        };
    }

    let passed = state.gates.get(stage.name()).copied().unwrap_or(false);
    if passed {
        return match stage.forward_next() {
            Some(next) => Transition::Forward(next),
            None => Transition::Complete,
        };
    }

    if stage == Stage::GateCitations && citation_issue_is_structural(&state.last_issues) {
        return Transition::Forward(Stage::NormalizeCitations);
    }

    if !state.budget_remaining() {
        return Transition::Exhausted;
    }

    let entry = match stage {
        Stage::GateQuality => match classify_quality_route(&state.last_issues) {
            QualityRoute::Outline => Stage::Outline,
            QualityRoute::Compose => Stage::Compose,
            QualityRoute::Draft => Stage::Draft,
            QualityRoute::Refine => Stage::Refine,
        },
        _ => Stage::Retrieve,
    };
    Transition::Retry(entry)
}
