//! Consensus verification and integrity status records

use serde::{Deserialize, Serialize};

/// Weighted contributions of the individual match signals.
///
/// Each field already carries its weight: `title_sim` is the best raw
/// similarity multiplied by 0.20, `doi_match` is 0.60 or 0.0, and so on.
/// The identity score is the rounded sum of these fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSignals {
    /// 0.60 when any corroborating work carries the exact DOI
    pub doi_match: f64,
    /// Best title similarity across corroborating works, weighted by 0.20
    pub title_sim: f64,
    /// 0.10 when any corroborating work agrees on the first author surname
    pub first_author: f64,
    /// 0.05 when any corroborating work agrees on the publication year
    pub year: f64,
    /// Best venue similarity, weighted by 0.05
    pub venue: f64,
}

impl MatchSignals {
    /// Unrounded sum of all weighted contributions.
    pub fn sum(&self) -> f64 {
        self.doi_match + self.title_sim + self.first_author + self.year + self.venue
    }
}

/// Outcome of one consensus verification pass for one source.
///
/// Immutable once produced; re-verification creates a fresh outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// 1.0 when at least one provider returned a corroborating work
    pub existence_score: f64,
    /// Weighted-signal identity confidence in [0, 1], rounded to 3 decimals
    pub identity_score: f64,
    /// Names of the providers whose works corroborated this identity
    pub consensus_providers: Vec<String>,
    /// The individual signal contributions behind the score
    pub signals: MatchSignals,
}

/// Integrity problem markers attached to a published work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityFlag {
    /// The work has been retracted
    Retracted,
    /// A correction has been issued
    Corrected,
    /// The publisher has issued an expression of concern
    ExpressionOfConcern,
    /// No status information was found
    Unknown,
}

impl IntegrityFlag {
    /// Short label used in warnings and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityFlag::Retracted => "retracted",
            IntegrityFlag::Corrected => "corrected",
            IntegrityFlag::ExpressionOfConcern => "eoc",
            IntegrityFlag::Unknown => "unknown",
        }
    }
}

/// Integrity flags plus the providers that evidenced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityStatus {
    /// Flags found for this source
    pub flags: Vec<IntegrityFlag>,
    /// Provider names that reported the flags
    pub evidence: Vec<String>,
}

impl IntegrityStatus {
    /// Whether any flag marks the work as retracted.
    pub fn is_retracted(&self) -> bool {
        self.flags.contains(&IntegrityFlag::Retracted)
    }

    /// Flags that warrant a warning but not exclusion.
    pub fn warning_flags(&self) -> Vec<IntegrityFlag> {
        self.flags
            .iter()
            .copied()
            .filter(|flag| {
                matches!(flag, IntegrityFlag::Corrected | IntegrityFlag::ExpressionOfConcern)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_sum() {
        let signals = MatchSignals {
            doi_match: 0.6,
            title_sim: 0.2,
            first_author: 0.1,
            year: 0.05,
            venue: 0.05,
        };
        assert!((signals.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn retracted_detection() {
        let status = IntegrityStatus {
            flags: vec![IntegrityFlag::Retracted, IntegrityFlag::Corrected],
            evidence: vec!["crossref".to_string()],
        };
        assert!(status.is_retracted());
        assert_eq!(status.warning_flags(), vec![IntegrityFlag::Corrected]);
    }

    #[test]
    fn unknown_is_neither_excluded_nor_warned() {
        let status = IntegrityStatus {
            flags: vec![IntegrityFlag::Unknown],
            evidence: Vec::new(),
        };
        assert!(!status.is_retracted());
        assert!(status.warning_flags().is_empty());
    }
}
