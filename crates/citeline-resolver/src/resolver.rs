//! Candidate-to-canonical resolution

use crate::stats::ResolveStats;
use citeline_domain::{
    CanonicalMetadata, EvidenceLinks, IdentifierSet, ProviderWork, SourceRecord,
};
use citeline_providers::{normalize_doi, ProviderSet};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").unwrap());

const PREPRINT_STUB_PREFIX: &str = "S-ARXIV-";

/// Extract a preprint id from a retrieval stub id.
pub fn extract_preprint_id(source_id: &str) -> Option<String> {
    source_id.strip_prefix(PREPRINT_STUB_PREFIX).map(str::to_string)
}

/// Find the first DOI-shaped token across the given fields.
pub fn extract_doi<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    for value in values.into_iter().flatten() {
        if let Some(found) = DOI_PATTERN.find(value) {
            return Some(found.as_str().to_string());
        }
    }
    None
}

/// Promotes retrieval candidates into canonical, DOI-first records.
pub struct Resolver {
    providers: ProviderSet,
}

impl Resolver {
    /// Build a resolver over the given provider set.
    pub fn new(providers: ProviderSet) -> Self {
        Self { providers }
    }

    /// Resolve every candidate and deduplicate on the canonical id.
    ///
    /// Later candidates resolving to an already-seen canonical id are
    /// dropped silently; only the first occurrence is kept.
    pub async fn resolve(&self, sources: Vec<SourceRecord>) -> (Vec<SourceRecord>, ResolveStats) {
        let mut stats = ResolveStats { total: sources.len(), ..ResolveStats::default() };
        let mut seen: HashSet<String> = HashSet::new();
        let mut resolved = Vec::new();
        for source in sources {
            let updated = self.resolve_one(source, &mut stats).await;
            let canonical = updated.cite_id().to_string();
            if !seen.insert(canonical) {
                debug!(source_id = %updated.source_id, "duplicate canonical id dropped");
                continue;
            }
            if updated.canonical_id.as_deref().is_some_and(|id| id.starts_with("doi:")) {
                stats.doi_confirmed += 1;
            }
            if updated.preprint_only {
                stats.preprint_only += 1;
            }
            resolved.push(updated);
        }
        info!("resolution complete: {}", stats.summary());
        (resolved, stats)
    }

    async fn resolve_one(&self, source: SourceRecord, stats: &mut ResolveStats) -> SourceRecord {
        let mut identifiers = source.identifiers.clone();
        if identifiers.preprint_id.is_none() {
            identifiers.preprint_id = extract_preprint_id(&source.source_id);
        }
        if identifiers.doi.is_none() {
            identifiers.doi = extract_doi([
                source.doi.as_deref(),
                source.url.as_deref(),
                Some(source.title.as_str()),
                source.abstract_text.as_deref(),
            ])
            .map(|doi| normalize_doi(&doi));
        }

        let mut canonical_work: Option<ProviderWork> = None;
        let mut oa_work: Option<ProviderWork> = None;
        if let Some(doi) = identifiers.doi.clone() {
            for provider in self.providers.doi_lookup_order() {
                let work = provider.work_by_doi(&doi).await;
                stats.track(provider.name(), work.is_some());
                if work.is_some() {
                    canonical_work = work;
                    break;
                }
            }
            oa_work = self.providers.oa_locator.work_by_doi(&doi).await;
            stats.track(self.providers.oa_locator.name(), oa_work.is_some());
        }

        if canonical_work.is_none() {
            let query = resolution_query(&source);
            if let Some(candidate) = self.best_candidate(&query).await {
                if let Some(doi) = candidate.doi.clone() {
                    if identifiers.doi.is_none() {
                        identifiers.doi = Some(doi.clone());
                    }
                    let confirmed = self.providers.crossref.work_by_doi(&doi).await;
                    stats.track(self.providers.crossref.name(), confirmed.is_some());
                    canonical_work = Some(confirmed.unwrap_or(candidate));
                    oa_work = self.providers.oa_locator.work_by_doi(&doi).await;
                    stats.track(self.providers.oa_locator.name(), oa_work.is_some());
                }
            }
        }

        apply_canonical(source, identifiers, canonical_work, oa_work)
    }

    /// Best search candidate across the secondary providers.
    ///
    /// Longest title wins; there is no confidence threshold, so a poor
    /// match can be selected when nothing better exists.
    async fn best_candidate(&self, query: &str) -> Option<ProviderWork> {
        let mut candidates = Vec::new();
        for provider in self.providers.search_providers() {
            candidates.extend(provider.search(query).await);
        }
        let mut best: Option<ProviderWork> = None;
        for work in candidates {
            let len = work.title.as_deref().map_or(0, str::len);
            let best_len = best
                .as_ref()
                .and_then(|w| w.title.as_deref())
                .map_or(0, str::len);
            if best.is_none() || len > best_len {
                best = Some(work);
            }
        }
        best
    }
}

fn resolution_query(source: &SourceRecord) -> String {
    let mut parts = vec![source.title.clone()];
    if let Some(first_author) = source.authors.first() {
        parts.push(first_author.clone());
    }
    if let Some(year) = source.year {
        parts.push(year.to_string());
    }
    parts.retain(|part| !part.is_empty());
    parts.join(" ")
}

fn apply_canonical(
    source: SourceRecord,
    mut identifiers: IdentifierSet,
    canonical_work: Option<ProviderWork>,
    oa_work: Option<ProviderWork>,
) -> SourceRecord {
    let mut metadata = metadata_from_source(&source);
    if let Some(work) = &canonical_work {
        metadata = metadata_from_provider(work, metadata);
        merge_identifiers(&mut identifiers, work);
    }

    let (canonical_id, preprint_only) = match (&identifiers.doi, &identifiers.preprint_id) {
        (Some(doi), _) => (format!("doi:{}", normalize_doi(doi)), false),
        (None, Some(preprint_id)) => (format!("preprint:{}", preprint_id), true),
        (None, None) => (source.source_id.clone(), true),
    };

    let landing = canonical_work
        .as_ref()
        .and_then(|work| work.url.clone())
        .or_else(|| source.url.clone());
    let oa_url = oa_work.and_then(|work| work.url);

    SourceRecord {
        identifiers,
        canonical_id: Some(canonical_id),
        canonical_metadata: Some(metadata),
        preprint_only,
        evidence_links: Some(EvidenceLinks { landing_page_url: landing, oa_url }),
        ..source
    }
}

fn metadata_from_source(source: &SourceRecord) -> CanonicalMetadata {
    CanonicalMetadata {
        title: Some(source.title.clone()),
        authors: source.authors.clone(),
        year: source.year,
        venue: source.venue.clone(),
        doi: source.doi.clone(),
        url: source.url.clone(),
    }
}

/// Provider-confirmed fields win; the candidate's own fields fill gaps.
fn metadata_from_provider(work: &ProviderWork, fallback: CanonicalMetadata) -> CanonicalMetadata {
    CanonicalMetadata {
        title: work.title.clone().or(fallback.title),
        authors: if work.authors.is_empty() { fallback.authors } else { work.authors.clone() },
        year: work.year.or(fallback.year),
        venue: work.venue.clone().or(fallback.venue),
        doi: work.doi.clone().or(fallback.doi),
        url: work.url.clone().or(fallback.url),
    }
}

fn merge_identifiers(identifiers: &mut IdentifierSet, work: &ProviderWork) {
    if identifiers.doi.is_none() {
        identifiers.doi = work.doi.clone();
    }
    if identifiers.openalex_id.is_none() {
        identifiers.openalex_id = work.identifiers.get("openalex_id").cloned();
    }
    if identifiers.s2_paper_id.is_none() {
        identifiers.s2_paper_id = work.identifiers.get("s2_paper_id").cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citeline_providers::StaticMetadataProvider;
    use std::sync::Arc;

    fn empty_provider(name: &str) -> Arc<StaticMetadataProvider> {
        Arc::new(StaticMetadataProvider::new(name))
    }

    fn provider_set(
        crossref: Arc<StaticMetadataProvider>,
        openalex: Arc<StaticMetadataProvider>,
        semanticscholar: Arc<StaticMetadataProvider>,
        oa_locator: Arc<StaticMetadataProvider>,
    ) -> ProviderSet {
        ProviderSet { crossref, openalex, semanticscholar, oa_locator }
    }

    fn crossref_work(doi: &str, title: &str) -> ProviderWork {
        ProviderWork {
            provider: "crossref".to_string(),
            title: Some(title.to_string()),
            authors: vec!["Ada Lovelace".to_string()],
            year: Some(2024),
            venue: Some("Journal of Things".to_string()),
            doi: Some(doi.to_string()),
            url: Some(format!("https://doi.org/{}", doi)),
            ..ProviderWork::default()
        }
    }

    #[test]
    fn doi_extraction_scans_all_fields() {
        let found = extract_doi([
            None,
            Some("https://example.org/paper"),
            Some("See 10.1234/ab.cd-5 for details"),
        ]);
        assert_eq!(found.as_deref(), Some("10.1234/ab.cd-5"));
        assert_eq!(extract_doi([Some("no identifier here")]), None);
    }

    #[test]
    fn preprint_id_extraction() {
        assert_eq!(
            extract_preprint_id("S-ARXIV-2101.00001v2").as_deref(),
            Some("2101.00001v2")
        );
        assert_eq!(extract_preprint_id("S-OPENALEX-0001"), None);
    }

    #[tokio::test]
    async fn same_doi_collapses_to_one_record() {
        let crossref = Arc::new(
            StaticMetadataProvider::new("crossref")
                .with_work("10.1234/abcd", crossref_work("10.1234/abcd", "Canonical Title")),
        );
        let resolver = Resolver::new(provider_set(
            crossref,
            empty_provider("openalex"),
            empty_provider("semanticscholar"),
            empty_provider("unpaywall"),
        ));
        let mut a = SourceRecord::stub("S-1", "Title A");
        a.doi = Some("10.1234/ABCD".to_string());
        let mut b = SourceRecord::stub("S-2", "Title B");
        b.url = Some("https://doi.org/10.1234/abcd".to_string());

        let (resolved, stats) = resolver.resolve(vec![a, b]).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].source_id, "S-1");
        assert_eq!(resolved[0].canonical_id.as_deref(), Some("doi:10.1234/abcd"));
        assert_eq!(stats.total, 2);
        assert_eq!(stats.doi_confirmed, 1);
    }

    #[tokio::test]
    async fn preprint_fallback_when_no_doi() {
        let resolver = Resolver::new(provider_set(
            empty_provider("crossref"),
            empty_provider("openalex"),
            empty_provider("semanticscholar"),
            empty_provider("unpaywall"),
        ));
        let source = SourceRecord::stub("S-ARXIV-2101.00001", "A Preprint");
        let (resolved, stats) = resolver.resolve(vec![source]).await;
        assert_eq!(resolved[0].canonical_id.as_deref(), Some("preprint:2101.00001"));
        assert!(resolved[0].preprint_only);
        assert_eq!(stats.preprint_only, 1);
        assert_eq!(stats.doi_confirmed, 0);
    }

    #[tokio::test]
    async fn raw_id_fallback_when_nothing_extractable() {
        let resolver = Resolver::new(provider_set(
            empty_provider("crossref"),
            empty_provider("openalex"),
            empty_provider("semanticscholar"),
            empty_provider("unpaywall"),
        ));
        let source = SourceRecord::stub("S-WEB-0001", "An Unidentified Page");
        let (resolved, _) = resolver.resolve(vec![source]).await;
        assert_eq!(resolved[0].canonical_id.as_deref(), Some("S-WEB-0001"));
        assert!(resolved[0].preprint_only);
    }

    #[tokio::test]
    async fn crossref_wins_lookup_priority() {
        let crossref = Arc::new(
            StaticMetadataProvider::new("crossref")
                .with_work("10.1234/abcd", crossref_work("10.1234/abcd", "Crossref Title")),
        );
        let openalex = Arc::new(StaticMetadataProvider::new("openalex").with_work(
            "10.1234/abcd",
            ProviderWork {
                provider: "openalex".to_string(),
                title: Some("OpenAlex Title".to_string()),
                ..ProviderWork::default()
            },
        ));
        let resolver = Resolver::new(provider_set(
            crossref,
            openalex,
            empty_provider("semanticscholar"),
            empty_provider("unpaywall"),
        ));
        let mut source = SourceRecord::stub("S-1", "Original Title");
        source.doi = Some("10.1234/abcd".to_string());
        let (resolved, stats) = resolver.resolve(vec![source]).await;
        let metadata = resolved[0].canonical_metadata.as_ref().unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Crossref Title"));
        assert_eq!(stats.provider_hits.get("crossref"), Some(&1));
        assert!(!stats.provider_hits.contains_key("openalex"));
        assert!(!stats.provider_misses.contains_key("openalex"));
    }

    #[tokio::test]
    async fn metadata_falls_back_field_by_field() {
        let work = ProviderWork {
            provider: "crossref".to_string(),
            title: Some("Confirmed Title".to_string()),
            doi: Some("10.1234/abcd".to_string()),
            ..ProviderWork::default()
        };
        let crossref =
            Arc::new(StaticMetadataProvider::new("crossref").with_work("10.1234/abcd", work));
        let resolver = Resolver::new(provider_set(
            crossref,
            empty_provider("openalex"),
            empty_provider("semanticscholar"),
            empty_provider("unpaywall"),
        ));
        let mut source = SourceRecord::stub("S-1", "Self-Reported Title");
        source.doi = Some("10.1234/abcd".to_string());
        source.venue = Some("Self-Reported Venue".to_string());
        source.year = Some(2020);
        let (resolved, _) = resolver.resolve(vec![source]).await;
        let metadata = resolved[0].canonical_metadata.as_ref().unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Confirmed Title"));
        assert_eq!(metadata.venue.as_deref(), Some("Self-Reported Venue"));
        assert_eq!(metadata.year, Some(2020));
    }

    #[tokio::test]
    async fn query_search_picks_longest_title_and_confirms() {
        let short = ProviderWork {
            provider: "openalex".to_string(),
            title: Some("Short".to_string()),
            doi: Some("10.1111/short".to_string()),
            ..ProviderWork::default()
        };
        let long = ProviderWork {
            provider: "openalex".to_string(),
            title: Some("A Much Longer Candidate Title".to_string()),
            doi: Some("10.2222/long".to_string()),
            ..ProviderWork::default()
        };
        let openalex = Arc::new(
            StaticMetadataProvider::new("openalex").with_search_results(vec![short, long]),
        );
        let crossref = Arc::new(
            StaticMetadataProvider::new("crossref")
                .with_work("10.2222/long", crossref_work("10.2222/long", "Confirmed Long")),
        );
        let resolver = Resolver::new(provider_set(
            crossref,
            openalex,
            empty_provider("semanticscholar"),
            empty_provider("unpaywall"),
        ));
        let mut source = SourceRecord::stub("S-1", "A Much Longer Candidate Title");
        source.authors = vec!["Kim".to_string()];
        source.year = Some(2024);
        let (resolved, _) = resolver.resolve(vec![source]).await;
        assert_eq!(resolved[0].canonical_id.as_deref(), Some("doi:10.2222/long"));
        let metadata = resolved[0].canonical_metadata.as_ref().unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Confirmed Long"));
    }

    #[tokio::test]
    async fn oa_link_recorded_independently_of_identity() {
        let unpaywall = Arc::new(StaticMetadataProvider::new("unpaywall").with_work(
            "10.1234/abcd",
            ProviderWork {
                provider: "unpaywall".to_string(),
                url: Some("https://repo.example.org/oa.pdf".to_string()),
                doi: Some("10.1234/abcd".to_string()),
                ..ProviderWork::default()
            },
        ));
        let resolver = Resolver::new(provider_set(
            empty_provider("crossref"),
            empty_provider("openalex"),
            empty_provider("semanticscholar"),
            unpaywall,
        ));
        let mut source = SourceRecord::stub("S-1", "A Title");
        source.doi = Some("10.1234/abcd".to_string());
        let (resolved, stats) = resolver.resolve(vec![source]).await;
        let links = resolved[0].evidence_links.as_ref().unwrap();
        assert_eq!(links.oa_url.as_deref(), Some("https://repo.example.org/oa.pdf"));
        // identity providers all missed, the canonical id still forms from the DOI
        assert_eq!(resolved[0].canonical_id.as_deref(), Some("doi:10.1234/abcd"));
        assert_eq!(stats.provider_misses.get("crossref"), Some(&1));
        assert_eq!(stats.provider_hits.get("unpaywall"), Some(&1));
    }
}
