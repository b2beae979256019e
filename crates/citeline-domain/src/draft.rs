//! Drafted chapter text and gate outcomes

use serde::{Deserialize, Serialize};

/// One drafted chapter paragraph and the sources it cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftNode {
    /// Chapter the paragraph belongs to
    pub chapter_id: String,
    /// Paragraph identifier within the chapter
    pub paragraph_id: String,
    /// Drafted text
    pub text: String,
    /// Claim ids the paragraph is built from
    #[serde(default)]
    pub claim_ids: Vec<String>,
    /// Canonical ids of the sources cited by the paragraph
    #[serde(default)]
    pub citation_source_ids: Vec<String>,
}

/// The outcome of a validation gate: either clean, or every issue found
/// in that pass. Never partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    /// True when no issue was found
    pub passed: bool,
    /// Every issue found in this pass
    #[serde(default)]
    pub issues: Vec<String>,
}

impl AuditResult {
    /// A passing result with no issues.
    pub fn clean() -> Self {
        Self { passed: true, issues: Vec::new() }
    }

    /// Build a result from an issue list; passes iff the list is empty.
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self { passed: issues.is_empty(), issues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_issues_sets_passed() {
        assert!(AuditResult::from_issues(Vec::new()).passed);
        assert!(!AuditResult::from_issues(vec!["bad".to_string()]).passed);
    }
}
