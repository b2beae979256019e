//! Collaborator wiring
//!
//! One `Collaborators` value is constructed per run and handed to the
//! stage handlers; nothing reaches external services except through it.

use crate::config::PipelineConfig;
use citeline_domain::traits::{EventSink, LiteratureSearch, NullEventSink, TextGenerator};
use citeline_domain::{ProviderWork, SourceRecord, SourceType};
use citeline_llm::OllamaGenerator;
use citeline_providers::{ProviderSet, ScholarSearchClient, StaticMetadataProvider, StaticSearch};
use std::sync::Arc;

/// External collaborators for one run.
#[derive(Clone)]
pub struct Collaborators {
    /// Metadata providers for resolution, consensus and status checking
    pub providers: ProviderSet,
    /// Literature search for the retrieval stage
    pub search: Arc<dyn LiteratureSearch>,
    /// Optional text generator; every stage has a deterministic fallback
    pub generator: Option<Arc<dyn TextGenerator>>,
    /// Optional event observer
    pub events: Arc<dyn EventSink>,
}

impl Collaborators {
    /// Live HTTP-backed collaborators.
    pub fn live(config: &PipelineConfig) -> Self {
        let providers = ProviderSet::live(&config.provider);
        let search = Arc::new(ScholarSearchClient::new(Arc::clone(&providers.openalex)));
        let generator: Option<Arc<dyn TextGenerator>> =
            match (&config.generator_endpoint, &config.generator_model) {
                (Some(endpoint), Some(model)) => {
                    Some(Arc::new(OllamaGenerator::new(endpoint, model)))
                }
                _ => None,
            };
        Self { providers, search, generator, events: Arc::new(NullEventSink) }
    }

    /// Deterministic collaborators: a scripted candidate pool whose
    /// identity the static providers corroborate, and no generator.
    pub fn mock() -> Self {
        let candidate = mock_candidate();
        let doi = candidate.doi.clone().unwrap_or_default();
        let confirm = |provider: &str| ProviderWork {
            provider: provider.to_string(),
            title: Some(candidate.title.clone()),
            authors: candidate.authors.clone(),
            year: candidate.year,
            venue: candidate.venue.clone(),
            doi: Some(doi.clone()),
            url: candidate.url.clone(),
            ..ProviderWork::default()
        };
        let providers = ProviderSet {
            crossref: Arc::new(
                StaticMetadataProvider::new("crossref").with_work(&doi, confirm("crossref")),
            ),
            openalex: Arc::new(
                StaticMetadataProvider::new("openalex").with_work(&doi, confirm("openalex")),
            ),
            semanticscholar: Arc::new(StaticMetadataProvider::new("semanticscholar")),
            oa_locator: Arc::new(StaticMetadataProvider::new("unpaywall")),
        };
        Self {
            providers,
            search: Arc::new(StaticSearch::new(vec![candidate])),
            generator: None,
            events: Arc::new(NullEventSink),
        }
    }

    /// Attach an event sink.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Attach a text generator.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }
}

/// The candidate the mock literature search returns.
pub fn mock_candidate() -> SourceRecord {
    SourceRecord {
        authors: vec!["J. Kim".to_string(), "H. Lee".to_string()],
        year: Some(2024),
        venue: Some("arXiv".to_string()),
        doi: Some("10.48550/arxiv.2401.01001".to_string()),
        url: Some("https://arxiv.org/abs/2401.01001".to_string()),
        abstract_text: Some(
            "We survey automated methods for assembling cited technical reports, \
             covering retrieval, identity resolution and evidence extraction."
                .to_string(),
        ),
        source_type: SourceType::Paper,
        ..SourceRecord::stub(
            "S-ARXIV-2401.01001",
            "Automated evidence synthesis for cited survey reporting",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_providers_corroborate_the_mock_candidate() {
        let collaborators = Collaborators::mock();
        let candidate = mock_candidate();
        let doi = candidate.doi.unwrap();
        let crossref = collaborators.providers.crossref.work_by_doi(&doi).await;
        let openalex = collaborators.providers.openalex.work_by_doi(&doi).await;
        assert!(crossref.is_some());
        assert!(openalex.is_some());
        assert_eq!(crossref.unwrap().title.as_deref(), Some(candidate.title.as_str()));
    }

    #[tokio::test]
    async fn mock_search_returns_the_candidate() {
        let collaborators = Collaborators::mock();
        let candidates = collaborators.search.search("anything", 10).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_id, "S-ARXIV-2401.01001");
    }
}
