//! Run state and stage updates

use citeline_domain::{DraftNode, EvidenceItem, RunInputs, SourceRecord};
use citeline_resolver::ResolveStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal disposition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Still executing
    Running,
    /// Reached the terminal stage with no accumulated errors
    Completed,
    /// Reached the terminal stage with errors or warnings on record
    CompletedWithIssues,
    /// Ended by budget exhaustion or a node-boundary fault
    Failed,
}

/// Search queries planned for one chapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterPlan {
    /// Chapter title
    pub chapter: String,
    /// Queries to run for this chapter
    pub queries: Vec<String>,
}

/// Counters from the retrieval stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalStats {
    /// Queries executed
    pub total_queries: usize,
    /// Candidates retrieved (after the pool cap)
    pub retrieved_sources: usize,
}

/// Counters from the evidence stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceStats {
    /// Evidence items extracted
    pub evidence_items: usize,
}

/// The single mutable aggregate threaded through a run.
///
/// Created once at run start; each stage returns a `StageUpdate` merged
/// into it; dropped once the run is terminal (the caller receives a
/// `FinalState` instead).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Current run inputs (the outline stage may replace them)
    pub inputs: RunInputs,
    /// Per-chapter query plan, in outline order
    pub plan: Vec<ChapterPlan>,
    /// Candidate / resolved source pool
    pub sources: Vec<SourceRecord>,
    /// Extracted evidence
    pub evidence: Vec<EvidenceItem>,
    /// Drafted chapters
    pub drafts: Vec<DraftNode>,
    /// Composed document, once reached
    pub composed_text: Option<String>,
    /// Gate name → most recent pass/fail
    pub gates: BTreeMap<String, bool>,
    /// Accumulated errors
    pub errors: Vec<String>,
    /// Accumulated warnings
    pub warnings: Vec<String>,
    /// Issues from the most recent failed gate (empty after a pass)
    pub last_issues: Vec<String>,
    /// Retry traversals consumed so far; monotonically non-decreasing
    pub iteration: u32,
    /// Fixed retry budget for this run
    pub max_iterations: u32,
    /// Retrieval counters
    pub retrieval_stats: RetrievalStats,
    /// Evidence counters
    pub evidence_stats: EvidenceStats,
    /// Resolution counters, observability only
    pub resolve_stats: Option<ResolveStats>,
}

impl RunState {
    /// Fresh state for the given inputs and budget.
    pub fn new(inputs: RunInputs, max_iterations: u32) -> Self {
        Self {
            inputs,
            plan: Vec::new(),
            sources: Vec::new(),
            evidence: Vec::new(),
            drafts: Vec::new(),
            composed_text: None,
            gates: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            last_issues: Vec::new(),
            iteration: 0,
            max_iterations,
            retrieval_stats: RetrievalStats::default(),
            evidence_stats: EvidenceStats::default(),
            resolve_stats: None,
        }
    }

    /// Whether the retry budget still allows another traversal.
    pub fn budget_remaining(&self) -> bool {
        self.iteration < self.max_iterations
    }

    /// Merge a stage's partial update into the aggregate.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(inputs) = update.inputs {
            self.inputs = inputs;
        }
        if let Some(plan) = update.plan {
            self.plan = plan;
        }
        if let Some(sources) = update.sources {
            self.sources = sources;
        }
        if let Some(evidence) = update.evidence {
            self.evidence = evidence;
        }
        if let Some(drafts) = update.drafts {
            self.drafts = drafts;
        }
        if let Some(composed_text) = update.composed_text {
            self.composed_text = Some(composed_text);
        }
        if let Some((gate, passed)) = update.gate {
            self.gates.insert(gate.to_string(), passed);
        }
        self.errors.extend(update.errors);
        self.warnings.extend(update.warnings);
        if let Some(last_issues) = update.last_issues {
            self.last_issues = last_issues;
        }
        if let Some(stats) = update.retrieval_stats {
            self.retrieval_stats = stats;
        }
        if let Some(stats) = update.evidence_stats {
            self.evidence_stats = stats;
        }
        if let Some(stats) = update.resolve_stats {
            self.resolve_stats = Some(stats);
        }
    }
}

/// Partial update returned by one stage execution.
///
/// `errors` and `warnings` append; every other field replaces its slot
/// when present.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate {
    /// Replacement inputs
    pub inputs: Option<RunInputs>,
    /// Replacement query plan
    pub plan: Option<Vec<ChapterPlan>>,
    /// Replacement source pool
    pub sources: Option<Vec<SourceRecord>>,
    /// Replacement evidence list
    pub evidence: Option<Vec<EvidenceItem>>,
    /// Replacement drafts
    pub drafts: Option<Vec<DraftNode>>,
    /// Composed document
    pub composed_text: Option<String>,
    /// Gate outcome to record
    pub gate: Option<(&'static str, bool)>,
    /// Errors to append
    pub errors: Vec<String>,
    /// Warnings to append
    pub warnings: Vec<String>,
    /// Replacement last-issue list
    pub last_issues: Option<Vec<String>>,
    /// Retrieval counters
    pub retrieval_stats: Option<RetrievalStats>,
    /// Evidence counters
    pub evidence_stats: Option<EvidenceStats>,
    /// Resolution counters
    pub resolve_stats: Option<ResolveStats>,
}

/// Everything a caller receives when a run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalState {
    /// Terminal disposition
    pub status: RunStatus,
    /// Inputs as of the last outline pass
    pub inputs: RunInputs,
    /// Resolved / verified sources
    pub sources: Vec<SourceRecord>,
    /// Extracted evidence
    pub evidence: Vec<EvidenceItem>,
    /// Drafted chapters
    pub drafts: Vec<DraftNode>,
    /// Composed document, if composition was reached
    pub composed_text: Option<String>,
    /// Gate pass/fail map
    pub gates: BTreeMap<String, bool>,
    /// Accumulated errors
    pub errors: Vec<String>,
    /// Accumulated warnings
    pub warnings: Vec<String>,
    /// Retry traversals consumed
    pub iterations_used: u32,
    /// Resolution counters
    pub resolve_stats: Option<ResolveStats>,
}

impl FinalState {
    /// Seal a run state into the caller-facing result.
    pub fn seal(state: RunState, failed: bool) -> Self {
        let status = if failed {
            RunStatus::Failed
        } else if state.errors.is_empty() && state.warnings.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithIssues
        };
        Self {
            status,
            inputs: state.inputs,
            sources: state.sources,
            evidence: state.evidence,
            drafts: state.drafts,
            composed_text: state.composed_text,
            gates: state.gates,
            errors: state.errors,
            warnings: state.warnings,
            iterations_used: state.iteration,
            resolve_stats: state.resolve_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_appends_errors_and_replaces_lists() {
        let mut state = RunState::new(RunInputs::from_prompt("topic"), 2);
        state.errors.push("first".to_string());
        state.apply(StageUpdate {
            errors: vec!["second".to_string()],
            last_issues: Some(vec!["issue".to_string()]),
            gate: Some(("gate-sources", false)),
            ..StageUpdate::default()
        });
        assert_eq!(state.errors, vec!["first", "second"]);
        assert_eq!(state.last_issues, vec!["issue"]);
        assert_eq!(state.gates.get("gate-sources"), Some(&false));

        state.apply(StageUpdate {
            last_issues: Some(Vec::new()),
            gate: Some(("gate-sources", true)),
            ..StageUpdate::default()
        });
        assert!(state.last_issues.is_empty());
        assert_eq!(state.gates.get("gate-sources"), Some(&true));
        assert_eq!(state.errors.len(), 2);
    }

    #[test]
    fn seal_classifies_status() {
        let clean = RunState::new(RunInputs::from_prompt("t"), 2);
        assert_eq!(FinalState::seal(clean, false).status, RunStatus::Completed);

        let mut warned = RunState::new(RunInputs::from_prompt("t"), 2);
        warned.warnings.push("w".to_string());
        assert_eq!(FinalState::seal(warned, false).status, RunStatus::CompletedWithIssues);

        let mut broken = RunState::new(RunInputs::from_prompt("t"), 2);
        broken.errors.push("e".to_string());
        assert_eq!(FinalState::seal(broken, true).status, RunStatus::Failed);
    }

    #[test]
    fn budget_check() {
        let mut state = RunState::new(RunInputs::from_prompt("t"), 1);
        assert!(state.budget_remaining());
        state.iteration = 1;
        assert!(!state.budget_remaining());
    }
}
