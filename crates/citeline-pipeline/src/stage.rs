//! Pipeline stages
//!
//! The stage graph is a fixed enum; routing and dispatch are resolved at
//! compile time rather than through string-keyed lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node in the pipeline graph, in canonical forward order.
///
/// `NormalizeCitations` and `Refine` are conditional side-paths: the
/// forward chain skips them and only the router steers into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Generate topic and chapter outline
    Outline,
    /// Build the per-chapter query plan
    Plan,
    /// Retrieve candidate sources
    Retrieve,
    /// Gate: candidate pool viability
    GateSources,
    /// Resolve candidates to canonical identities
    Resolve,
    /// Gate: multi-provider identity consensus
    GateConsensus,
    /// Screen integrity status
    StatusCheck,
    /// Extract evidence snippets
    ExtractEvidence,
    /// Gate: per-chapter evidence coverage
    GateEvidence,
    /// Draft chapter text
    Draft,
    /// Gate: citation integrity
    GateCitations,
    /// Conditional: rewrite citation placeholders
    NormalizeCitations,
    /// Compose the final document
    Compose,
    /// Gate: overall quality review
    GateQuality,
    /// Conditional: refine the query plan from accumulated issues
    Refine,
}

impl Stage {
    /// Stage name used in events and the gate map.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Outline => "outline",
            Stage::Plan => "plan",
            Stage::Retrieve => "retrieve",
            Stage::GateSources => "gate-sources",
            Stage::Resolve => "resolve",
            Stage::GateConsensus => "gate-consensus",
            Stage::StatusCheck => "status-check",
            Stage::ExtractEvidence => "extract-evidence",
            Stage::GateEvidence => "gate-evidence-coverage",
            Stage::Draft => "draft",
            Stage::GateCitations => "gate-citations",
            Stage::NormalizeCitations => "normalize-citations",
            Stage::Compose => "compose",
            Stage::GateQuality => "gate-quality",
            Stage::Refine => "refine",
        }
    }

    /// The next stage on the forward (all-gates-pass) path.
    ///
    /// `None` marks the terminal stage. The side-paths rejoin the main
    /// chain: normalization proceeds to composition, refinement re-enters
    /// retrieval.
    pub fn forward_next(&self) -> Option<Stage> {
        match self {
            Stage::Outline => Some(Stage::Plan),
            Stage::Plan => Some(Stage::Retrieve),
            Stage::Retrieve => Some(Stage::GateSources),
            Stage::GateSources => Some(Stage::Resolve),
            Stage::Resolve => Some(Stage::GateConsensus),
            Stage::GateConsensus => Some(Stage::StatusCheck),
            Stage::StatusCheck => Some(Stage::ExtractEvidence),
            Stage::ExtractEvidence => Some(Stage::GateEvidence),
            Stage::GateEvidence => Some(Stage::Draft),
            Stage::Draft => Some(Stage::GateCitations),
            Stage::GateCitations => Some(Stage::Compose),
            Stage::NormalizeCitations => Some(Stage::Compose),
            Stage::Compose => Some(Stage::GateQuality),
            Stage::GateQuality => None,
            Stage::Refine => Some(Stage::Retrieve),
        }
    }

    /// Whether this stage is a validation gate.
    pub fn is_gate(&self) -> bool {
        matches!(
            self,
            Stage::GateSources | Stage::GateConsensus | Stage::GateEvidence
                | Stage::GateCitations | Stage::GateQuality
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_chain_reaches_terminal() {
        let mut stage = Stage::Outline;
        let mut visited = vec![stage];
        while let Some(next) = stage.forward_next() {
            stage = next;
            visited.push(stage);
            assert!(visited.len() < 20);
        }
        assert_eq!(stage, Stage::GateQuality);
        assert!(!visited.contains(&Stage::NormalizeCitations));
        assert!(!visited.contains(&Stage::Refine));
    }

    #[test]
    fn side_paths_rejoin_the_chain() {
        assert_eq!(Stage::NormalizeCitations.forward_next(), Some(Stage::Compose));
        assert_eq!(Stage::Refine.forward_next(), Some(Stage::Retrieve));
    }

    #[test]
    fn gates_are_marked() {
        assert!(Stage::GateSources.is_gate());
        assert!(Stage::GateQuality.is_gate());
        assert!(!Stage::Resolve.is_gate());
        assert!(!Stage::StatusCheck.is_gate());
    }
}
