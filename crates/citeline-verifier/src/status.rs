//! Integrity status checking

use citeline_domain::{IntegrityFlag, IntegrityStatus, SourceRecord};
use citeline_providers::{normalize_doi, ProviderSet};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// How retraction findings are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityMode {
    /// Retracted sources are excluded and recorded as errors
    #[default]
    Strict,
    /// Retracted sources are retained with a warning
    Lenient,
}

/// Result of one status-checking pass.
#[derive(Debug, Clone)]
pub struct StatusOutcome {
    /// Sources remaining in the pool, with status attached
    pub sources: Vec<SourceRecord>,
    /// Integrity warnings (corrections, concerns, lenient retractions)
    pub warnings: Vec<String>,
    /// Hard errors (strict-mode retractions)
    pub errors: Vec<String>,
}

/// Screens sources for known integrity problems.
///
/// Only DOI-bearing sources are queried; everything else keeps the
/// `unknown` flag without a provider call.
pub struct StatusChecker {
    providers: ProviderSet,
    mode: IntegrityMode,
}

impl StatusChecker {
    /// Build a checker over the given provider set.
    pub fn new(providers: ProviderSet, mode: IntegrityMode) -> Self {
        Self { providers, mode }
    }

    /// Attach status flags and filter retracted sources per the mode.
    pub async fn check(&self, sources: Vec<SourceRecord>) -> StatusOutcome {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        let mut remaining = Vec::new();
        for source in sources {
            let mut status = IntegrityStatus::default();
            if let Some(doi) = source_doi(&source) {
                if let Some(work) = self.providers.crossref.work_by_doi(&doi).await {
                    status.flags = work.status_flags.iter().filter_map(|s| parse_flag(s)).collect();
                    if !status.flags.is_empty() {
                        status.evidence.push(self.providers.crossref.name().to_string());
                    }
                }
            }
            if status.flags.is_empty() {
                status.flags = vec![IntegrityFlag::Unknown];
            }

            let label = source_label(&source);
            if status.is_retracted() {
                let message = format!("Retracted source excluded: {}", label);
                match self.mode {
                    IntegrityMode::Strict => {
                        warn!(source = %label, "retracted source excluded");
                        errors.push(message);
                        continue;
                    }
                    IntegrityMode::Lenient => {
                        warnings.push(format!("Retracted source retained: {}", label));
                    }
                }
            }
            let warning_flags = status.warning_flags();
            if !warning_flags.is_empty() {
                let names: Vec<&str> = warning_flags.iter().map(IntegrityFlag::as_str).collect();
                warnings.push(format!(
                    "Source has integrity flag ({}): {}",
                    names.join(", "),
                    label
                ));
            }
            remaining.push(SourceRecord { status: Some(status), ..source });
        }
        info!(
            remaining = remaining.len(),
            warnings = warnings.len(),
            errors = errors.len(),
            "status check complete"
        );
        StatusOutcome { sources: remaining, warnings, errors }
    }
}

fn source_doi(source: &SourceRecord) -> Option<String> {
    source
        .canonical_metadata
        .as_ref()
        .and_then(|meta| meta.doi.clone())
        .or_else(|| source.identifiers.doi.clone())
        .or_else(|| source.doi.clone())
        .map(|doi| normalize_doi(&doi))
}

fn source_label(source: &SourceRecord) -> String {
    if source.title.is_empty() {
        source.cite_id().to_string()
    } else {
        source.title.clone()
    }
}

fn parse_flag(flag: &str) -> Option<IntegrityFlag> {
    match flag {
        "retracted" => Some(IntegrityFlag::Retracted),
        "corrected" => Some(IntegrityFlag::Corrected),
        "eoc" => Some(IntegrityFlag::ExpressionOfConcern),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citeline_domain::ProviderWork;
    use citeline_providers::StaticMetadataProvider;
    use std::sync::Arc;

    fn providers_with_flags(doi: &str, flags: &[&str]) -> ProviderSet {
        let work = ProviderWork {
            provider: "crossref".to_string(),
            doi: Some(doi.to_string()),
            status_flags: flags.iter().map(|s| s.to_string()).collect(),
            ..ProviderWork::default()
        };
        ProviderSet {
            crossref: Arc::new(StaticMetadataProvider::new("crossref").with_work(doi, work)),
            openalex: Arc::new(StaticMetadataProvider::new("openalex")),
            semanticscholar: Arc::new(StaticMetadataProvider::new("semanticscholar")),
            oa_locator: Arc::new(StaticMetadataProvider::new("unpaywall")),
        }
    }

    fn doi_source(doi: &str) -> SourceRecord {
        let mut source = SourceRecord::stub("S-1", "Flagged Paper");
        source.doi = Some(doi.to_string());
        source
    }

    #[tokio::test]
    async fn strict_mode_excludes_retracted() {
        let checker =
            StatusChecker::new(providers_with_flags("10.1/x", &["retracted"]), IntegrityMode::Strict);
        let outcome = checker.check(vec![doi_source("10.1/x")]).await;
        assert!(outcome.sources.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Retracted source excluded"));
    }

    #[tokio::test]
    async fn lenient_mode_retains_retracted_with_warning() {
        let checker = StatusChecker::new(
            providers_with_flags("10.1/x", &["retracted"]),
            IntegrityMode::Lenient,
        );
        let outcome = checker.check(vec![doi_source("10.1/x")]).await;
        assert_eq!(outcome.sources.len(), 1);
        assert!(outcome.errors.is_empty());
        assert!(outcome.warnings[0].contains("Retracted source retained"));
        assert!(outcome.sources[0].status.as_ref().unwrap().is_retracted());
    }

    #[tokio::test]
    async fn corrections_warn_but_do_not_exclude() {
        let checker = StatusChecker::new(
            providers_with_flags("10.1/x", &["corrected", "eoc"]),
            IntegrityMode::Strict,
        );
        let outcome = checker.check(vec![doi_source("10.1/x")]).await;
        assert_eq!(outcome.sources.len(), 1);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("corrected, eoc"));
    }

    #[tokio::test]
    async fn doiless_sources_keep_unknown_without_lookup() {
        let checker =
            StatusChecker::new(providers_with_flags("10.1/x", &["retracted"]), IntegrityMode::Strict);
        let source = SourceRecord::stub("S-NO-DOI", "No Identifier");
        let outcome = checker.check(vec![source]).await;
        assert_eq!(outcome.sources.len(), 1);
        let status = outcome.sources[0].status.as_ref().unwrap();
        assert_eq!(status.flags, vec![IntegrityFlag::Unknown]);
        assert!(status.evidence.is_empty());
    }

    #[tokio::test]
    async fn clean_doi_gets_unknown_flag() {
        let checker =
            StatusChecker::new(providers_with_flags("10.1/x", &[]), IntegrityMode::Strict);
        let outcome = checker.check(vec![doi_source("10.1/x")]).await;
        let status = outcome.sources[0].status.as_ref().unwrap();
        assert_eq!(status.flags, vec![IntegrityFlag::Unknown]);
        assert!(outcome.warnings.is_empty());
    }
}
