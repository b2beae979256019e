//! Multi-provider consensus scoring

use citeline_domain::{
    AuditResult, CanonicalMetadata, MatchSignals, ProviderWork, SourceRecord, VerificationOutcome,
};
use citeline_providers::ProviderSet;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

const DOI_WEIGHT: f64 = 0.60;
const TITLE_WEIGHT: f64 = 0.20;
const AUTHOR_WEIGHT: f64 = 0.10;
const YEAR_WEIGHT: f64 = 0.05;
const VENUE_WEIGHT: f64 = 0.05;

const ACCEPT_THRESHOLD: f64 = 0.85;
const PENDING_THRESHOLD: f64 = 0.60;
const SINGLE_PROVIDER_CAP: f64 = 0.70;
const FORCE_REJECT_TITLE_FLOOR: f64 = 0.10;

/// Confidence band a scored source falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusBand {
    /// Identity independently corroborated; citable
    Accepted,
    /// Some corroboration, not enough to cite
    Pending,
    /// No usable corroboration
    Rejected,
}

impl ConsensusBand {
    /// Band for an identity score.
    pub fn for_score(score: f64) -> Self {
        if score >= ACCEPT_THRESHOLD {
            ConsensusBand::Accepted
        } else if score >= PENDING_THRESHOLD {
            ConsensusBand::Pending
        } else {
            ConsensusBand::Rejected
        }
    }
}

/// Partition produced by one verification pass.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    /// Sources whose identity was corroborated
    pub accepted: Vec<SourceRecord>,
    /// Sources with partial corroboration
    pub pending: Vec<SourceRecord>,
    /// Sources with no usable corroboration
    pub rejected: Vec<SourceRecord>,
    /// Gate outcome: passes iff pending and rejected are both empty
    pub audit: AuditResult,
}

/// Scores resolved sources against independent provider lookups.
pub struct ConsensusVerifier {
    providers: ProviderSet,
    max_concurrency: usize,
}

impl ConsensusVerifier {
    /// Build a verifier over the given provider set.
    pub fn new(providers: ProviderSet, max_concurrency: usize) -> Self {
        Self { providers, max_concurrency: max_concurrency.max(1) }
    }

    /// Score every source and partition by confidence band.
    ///
    /// Lookups fan out under the concurrency limit; results are reduced
    /// in input order regardless of completion order. Every source gets a
    /// fresh `VerificationOutcome` attached.
    pub async fn verify(&self, sources: Vec<SourceRecord>) -> ConsensusOutcome {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let tasks = sources.into_iter().enumerate().map(|(index, source)| {
            let providers = self.providers.clone();
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await;
                (index, score_source(&providers, source).await)
            }
        });
        let mut scored: Vec<(usize, SourceRecord)> = join_all(tasks).await;
        scored.sort_by_key(|(index, _)| *index);

        let mut accepted = Vec::new();
        let mut pending = Vec::new();
        let mut rejected = Vec::new();
        for (_, source) in scored {
            let score = source
                .verification
                .as_ref()
                .map_or(0.0, |outcome| outcome.identity_score);
            match ConsensusBand::for_score(score) {
                ConsensusBand::Accepted => accepted.push(source),
                ConsensusBand::Pending => pending.push(source),
                ConsensusBand::Rejected => rejected.push(source),
            }
        }

        let mut issues = Vec::new();
        if !pending.is_empty() {
            issues.push(format!("Consensus pending for {} sources.", pending.len()));
        }
        if !rejected.is_empty() {
            issues.push(format!("Consensus rejected for {} sources.", rejected.len()));
        }
        info!(
            accepted = accepted.len(),
            pending = pending.len(),
            rejected = rejected.len(),
            "consensus verification complete"
        );
        ConsensusOutcome { accepted, pending, rejected, audit: AuditResult::from_issues(issues) }
    }
}

async fn score_source(providers: &ProviderSet, source: SourceRecord) -> SourceRecord {
    let canonical = source.canonical_metadata.clone().unwrap_or_default();
    let doi = canonical.doi.clone().or_else(|| source.doi.clone());

    let mut works: Vec<ProviderWork> = Vec::new();
    if let Some(doi) = &doi {
        for provider in providers.doi_lookup_order() {
            if let Some(work) = provider.work_by_doi(doi).await {
                works.push(work);
            }
        }
    } else {
        let query = resolution_query(&source, &canonical);
        for provider in providers.search_providers() {
            works.extend(provider.search(&query).await);
        }
    }

    let mut consensus_providers: Vec<String> =
        works.iter().map(|work| work.provider.clone()).collect();
    consensus_providers.sort();
    consensus_providers.dedup();

    let signals = match_signals(&source, &canonical, &works);
    let mut score = round3(signals.sum());
    let existence_score = if works.is_empty() { 0.0 } else { 1.0 };
    if should_force_reject(&signals) {
        debug!(source_id = %source.source_id, "DOI matched without secondary corroboration, forcing reject");
        score = 0.0;
    }
    if doi.is_some() && consensus_providers.len() < 2 {
        score = score.min(SINGLE_PROVIDER_CAP);
    }

    let verification = VerificationOutcome {
        existence_score,
        identity_score: score,
        consensus_providers,
        signals,
    };
    SourceRecord { verification: Some(verification), ..source }
}

fn resolution_query(source: &SourceRecord, canonical: &CanonicalMetadata) -> String {
    let title = canonical.title.clone().unwrap_or_else(|| source.title.clone());
    let mut parts = vec![title];
    let authors = if canonical.authors.is_empty() { &source.authors } else { &canonical.authors };
    if let Some(first_author) = authors.first() {
        parts.push(first_author.clone());
    }
    if let Some(year) = canonical.year.or(source.year) {
        parts.push(year.to_string());
    }
    parts.retain(|part| !part.is_empty());
    parts.join(" ")
}

fn match_signals(
    source: &SourceRecord,
    canonical: &CanonicalMetadata,
    works: &[ProviderWork],
) -> MatchSignals {
    let base_title = canonical.title.as_deref().unwrap_or(&source.title);
    let base_authors = if canonical.authors.is_empty() { &source.authors } else { &canonical.authors };
    let base_year = canonical.year.or(source.year);
    let base_venue = canonical.venue.as_deref().or(source.venue.as_deref());
    let base_doi = canonical.doi.as_deref().or(source.doi.as_deref());

    let mut doi_match = 0.0;
    let mut best_title = 0.0_f64;
    let mut best_venue = 0.0_f64;
    let mut author_match = 0.0;
    let mut year_match = 0.0;
    for work in works {
        if let (Some(base), Some(found)) = (base_doi, work.doi.as_deref()) {
            if base.eq_ignore_ascii_case(found) {
                doi_match = DOI_WEIGHT;
            }
        }
        best_title = best_title.max(similarity(Some(base_title), work.title.as_deref()));
        best_venue = best_venue.max(similarity(base_venue, work.venue.as_deref()));
        if let (Some(base), Some(found)) = (base_year, work.year) {
            if base == found {
                year_match = YEAR_WEIGHT;
            }
        }
        if !base_authors.is_empty()
            && !work.authors.is_empty()
            && first_author_surname(base_authors) == first_author_surname(&work.authors)
        {
            author_match = AUTHOR_WEIGHT;
        }
    }
    MatchSignals {
        doi_match,
        title_sim: best_title * TITLE_WEIGHT,
        first_author: author_match,
        year: year_match,
        venue: best_venue * VENUE_WEIGHT,
    }
}

/// A DOI match alone is not trusted: with no title, author or year
/// corroboration the score is forced to zero.
fn should_force_reject(signals: &MatchSignals) -> bool {
    signals.doi_match > 0.0
        && signals.title_sim < FORCE_REJECT_TITLE_FLOOR
        && signals.first_author == 0.0
        && signals.year == 0.0
}

fn similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
            strsim::normalized_levenshtein(&normalize(a), &normalize(b))
        }
        _ => 0.0,
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

fn first_author_surname(authors: &[String]) -> String {
    authors
        .first()
        .and_then(|author| author.split_whitespace().last())
        .map(|surname| surname.to_lowercase())
        .unwrap_or_default()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
