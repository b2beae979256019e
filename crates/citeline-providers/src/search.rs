//! Literature search collaborators
//!
//! `ScholarSearchClient` turns metadata-provider search hits into raw
//! candidate stubs for the retrieval stage. Candidates whose DOI marks an
//! arXiv deposit keep the `S-ARXIV-<id>` stub shape so the resolver can
//! extract the preprint id later.

use async_trait::async_trait;
use citeline_domain::traits::{LiteratureSearch, MetadataProvider};
use citeline_domain::{ProviderWork, SourceRecord, SourceType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const ARXIV_DOI_PREFIX: &str = "10.48550/arxiv.";

/// Literature search backed by a metadata provider's search endpoint.
pub struct ScholarSearchClient {
    provider: Arc<dyn MetadataProvider>,
    counter: AtomicUsize,
}

impl ScholarSearchClient {
    /// Search through the given provider (OpenAlex in the live set).
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self { provider, counter: AtomicUsize::new(0) }
    }

    fn stub_id(&self, work: &ProviderWork) -> String {
        if let Some(doi) = &work.doi {
            if let Some(arxiv_id) = doi.strip_prefix(ARXIV_DOI_PREFIX) {
                return format!("S-ARXIV-{}", arxiv_id);
            }
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("S-{}-{:04}", self.provider.name().to_uppercase(), n)
    }

    fn to_candidate(&self, work: ProviderWork) -> SourceRecord {
        let source_id = self.stub_id(&work);
        let retrieved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs().to_string());
        SourceRecord {
            source_id,
            title: work.title.unwrap_or_default(),
            authors: work.authors,
            year: work.year,
            venue: work.venue,
            doi: work.doi,
            url: work.url,
            abstract_text: work.abstract_text,
            source_type: SourceType::Paper,
            retrieved_at,
            ..SourceRecord::stub("", "")
        }
    }
}

#[async_trait]
impl LiteratureSearch for ScholarSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Vec<SourceRecord> {
        self.provider
            .search(query)
            .await
            .into_iter()
            .take(limit)
            .map(|work| self.to_candidate(work))
            .collect()
    }
}

/// A literature search returning a fixed candidate list for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    candidates: Vec<SourceRecord>,
}

impl StaticSearch {
    /// Create a search that always returns the given candidates.
    pub fn new(candidates: Vec<SourceRecord>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl LiteratureSearch for StaticSearch {
    async fn search(&self, _query: &str, limit: usize) -> Vec<SourceRecord> {
        self.candidates.iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticMetadataProvider;

    fn arxiv_work() -> ProviderWork {
        ProviderWork {
            provider: "openalex".to_string(),
            title: Some("Preprint Title".to_string()),
            doi: Some("10.48550/arxiv.2101.00001".to_string()),
            ..ProviderWork::default()
        }
    }

    #[tokio::test]
    async fn arxiv_hits_keep_preprint_stub_shape() {
        let provider = Arc::new(
            StaticMetadataProvider::new("openalex").with_search_results(vec![arxiv_work()]),
        );
        let search = ScholarSearchClient::new(provider);
        let candidates = search.search("anything", 5).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_id, "S-ARXIV-2101.00001");
    }

    #[tokio::test]
    async fn plain_hits_get_sequential_stub_ids() {
        let work = ProviderWork {
            provider: "openalex".to_string(),
            title: Some("Journal Paper".to_string()),
            doi: Some("10.1234/abcd".to_string()),
            ..ProviderWork::default()
        };
        let provider = Arc::new(
            StaticMetadataProvider::new("openalex")
                .with_search_results(vec![work.clone(), work]),
        );
        let search = ScholarSearchClient::new(provider);
        let candidates = search.search("anything", 5).await;
        assert_eq!(candidates[0].source_id, "S-OPENALEX-0001");
        assert_eq!(candidates[1].source_id, "S-OPENALEX-0002");
    }

    #[tokio::test]
    async fn static_search_respects_limit() {
        let search = StaticSearch::new(vec![
            SourceRecord::stub("S-1", "One"),
            SourceRecord::stub("S-2", "Two"),
        ]);
        assert_eq!(search.search("q", 1).await.len(), 1);
    }
}
