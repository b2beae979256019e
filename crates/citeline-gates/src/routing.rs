//! Issue-to-route classification tables

use serde::{Deserialize, Serialize};

/// Stage a failed quality gate should re-enter at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRoute {
    /// Topical / consistency / scope problems: rebuild the outline
    Outline,
    /// Summary / keyword / reference / structure problems: recompose
    Compose,
    /// Style problems: redraft chapters
    Draft,
    /// Reproducibility / methodology / evidence problems: refine queries
    Refine,
}

const OUTLINE_KEYWORDS: &[&str] = &["topic", "consistency", "scope"];
const COMPOSE_KEYWORDS: &[&str] = &["summary", "keyword", "reference", "structure", "section"];
const DRAFT_KEYWORDS: &[&str] = &["style", "honorific", "tone"];
const REFINE_KEYWORDS: &[&str] = &["reproducib", "methodolog", "source", "evidence"];

/// Classify quality-gate issues into a retry route.
///
/// Fixed keyword table, first matching row wins, default is the drafting
/// stage.
pub fn classify_quality_route(issues: &[String]) -> QualityRoute {
    let joined = issues.join(" ").to_lowercase();
    let table: [(&[&str], QualityRoute); 4] = [
        (OUTLINE_KEYWORDS, QualityRoute::Outline),
        (COMPOSE_KEYWORDS, QualityRoute::Compose),
        (DRAFT_KEYWORDS, QualityRoute::Draft),
        (REFINE_KEYWORDS, QualityRoute::Refine),
    ];
    for (keywords, route) in table {
        if keywords.iter().any(|keyword| joined.contains(keyword)) {
            return route;
        }
    }
    QualityRoute::Draft
}

const STRUCTURAL_SIGNALS: &[&str] =
    &["non-standard", "format", "placeholder", "s-arxiv", "bibliographic", "authors", "titles"];

/// Whether citation-gate issues have a structural remediation
/// (citation normalization) instead of a retry.
pub fn citation_issue_is_structural(issues: &[String]) -> bool {
    let joined = issues.join(" ").to_lowercase();
    STRUCTURAL_SIGNALS.iter().any(|signal| joined.contains(signal))
}
