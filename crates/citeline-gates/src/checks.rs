//! Gate checks

use citeline_domain::{AuditResult, DraftNode, EvidenceItem, SourceRecord};
use std::collections::BTreeSet;

/// Validate the retrieved candidate pool.
///
/// Fails when the pool is empty, when no candidate has a resolvable
/// locator, or when no candidate is a primary source.
pub fn gate_sources(sources: &[SourceRecord]) -> AuditResult {
    let mut issues = Vec::new();
    if sources.is_empty() {
        issues.push("No sources retrieved.".to_string());
    }
    if !sources.iter().any(SourceRecord::has_resolvable_locator) {
        issues.push("No source has a resolvable DOI or URL.".to_string());
    }
    if !sources.iter().any(SourceRecord::is_primary) {
        issues.push("No primary sources (paper/report/official) found.".to_string());
    }
    AuditResult::from_issues(issues)
}

/// Validate that every outline chapter has at least one evidence item.
///
/// Reports one issue per uncovered chapter.
pub fn gate_evidence_coverage(outline: &[String], evidence: &[EvidenceItem]) -> AuditResult {
    let covered: BTreeSet<&str> = evidence
        .iter()
        .filter_map(|item| item.chapter_id.as_deref())
        .collect();
    let issues = outline
        .iter()
        .filter(|chapter| !covered.contains(chapter.as_str()))
        .map(|chapter| format!("No usable evidence for chapter: {}", chapter))
        .collect();
    AuditResult::from_issues(issues)
}

/// Validate that drafted text only cites known canonical ids.
pub fn gate_citations(sources: &[SourceRecord], drafts: &[DraftNode]) -> AuditResult {
    let mut issues = Vec::new();
    let known: BTreeSet<&str> = sources.iter().map(SourceRecord::cite_id).collect();
    let cited: BTreeSet<&str> = drafts
        .iter()
        .flat_map(|draft| draft.citation_source_ids.iter().map(String::as_str))
        .collect();
    let missing: Vec<&str> = cited.difference(&known).copied().collect();
    if !missing.is_empty() {
        issues.push(format!("Missing cited sources: {}", missing.join(", ")));
    }
    if drafts.is_empty() {
        issues.push("No draft content produced.".to_string());
    }
    AuditResult::from_issues(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use citeline_domain::SourceType;

    fn evidence(chapter: &str) -> EvidenceItem {
        EvidenceItem {
            claim_id: format!("{}-C001", chapter),
            source_id: "doi:10.1/x".to_string(),
            snippet: "snippet".to_string(),
            locator: Some("abstract".to_string()),
            relevance_score: 0.5,
            chapter_id: Some(chapter.to_string()),
        }
    }

    fn draft(chapter: &str, citations: &[&str]) -> DraftNode {
        DraftNode {
            chapter_id: chapter.to_string(),
            paragraph_id: format!("{}-P001", chapter),
            text: "text".to_string(),
            claim_ids: Vec::new(),
            citation_source_ids: citations.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_pool_fails_every_check() {
        let audit = gate_sources(&[]);
        assert!(!audit.passed);
        assert_eq!(audit.issues.len(), 3);
    }

    #[test]
    fn locator_and_primary_pass() {
        let mut source = SourceRecord::stub("S-1", "Paper");
        source.doi = Some("10.1/x".to_string());
        let audit = gate_sources(std::slice::from_ref(&source));
        assert!(audit.passed);
    }

    #[test]
    fn web_only_pool_fails_primary_check() {
        let mut source = SourceRecord::stub("S-1", "Page");
        source.url = Some("https://example.org".to_string());
        source.source_type = SourceType::Web;
        let audit = gate_sources(&[source]);
        assert!(!audit.passed);
        assert_eq!(audit.issues, vec!["No primary sources (paper/report/official) found."]);
    }

    #[test]
    fn evidence_gate_reports_each_missing_chapter() {
        let outline = vec!["C1".to_string(), "C2".to_string(), "C3".to_string()];
        let audit = gate_evidence_coverage(&outline, &[evidence("C2")]);
        assert!(!audit.passed);
        assert_eq!(
            audit.issues,
            vec![
                "No usable evidence for chapter: C1".to_string(),
                "No usable evidence for chapter: C3".to_string(),
            ]
        );
    }

    #[test]
    fn evidence_gate_passes_when_all_covered() {
        let outline = vec!["C1".to_string()];
        assert!(gate_evidence_coverage(&outline, &[evidence("C1")]).passed);
    }

    #[test]
    fn citation_gate_flags_unknown_ids() {
        let mut source = SourceRecord::stub("S-1", "Paper");
        source.canonical_id = Some("doi:10.1/x".to_string());
        let audit = gate_citations(
            &[source],
            &[draft("C1", &["doi:10.1/x", "doi:10.9/missing"])],
        );
        assert!(!audit.passed);
        assert_eq!(audit.issues, vec!["Missing cited sources: doi:10.9/missing"]);
    }

    #[test]
    fn citation_gate_requires_drafts() {
        let audit = gate_citations(&[], &[]);
        assert!(!audit.passed);
        assert_eq!(audit.issues, vec!["No draft content produced."]);
    }

    #[test]
    fn gates_are_pure() {
        let outline = vec!["C1".to_string()];
        let items = vec![evidence("C1")];
        assert_eq!(
            gate_evidence_coverage(&outline, &items),
            gate_evidence_coverage(&outline, &items)
        );
    }
}
