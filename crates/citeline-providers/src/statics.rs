//! Deterministic in-memory metadata provider
//!
//! Backs tests and mock mode without network calls, the same way the
//! pipeline's other collaborators have scripted stand-ins.

use crate::normalize_doi;
use async_trait::async_trait;
use citeline_domain::traits::MetadataProvider;
use citeline_domain::ProviderWork;
use std::collections::HashMap;

/// A metadata provider answering from pre-loaded works.
///
/// # Examples
///
/// ```
/// use citeline_providers::StaticMetadataProvider;
/// use citeline_domain::ProviderWork;
///
/// let provider = StaticMetadataProvider::new("crossref")
///     .with_work("10.1234/abcd", ProviderWork {
///         provider: "crossref".to_string(),
///         title: Some("A Title".to_string()),
///         ..ProviderWork::default()
///     });
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    name: String,
    works_by_doi: HashMap<String, ProviderWork>,
    search_results: Vec<ProviderWork>,
}

impl StaticMetadataProvider {
    /// Create an empty provider with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            works_by_doi: HashMap::new(),
            search_results: Vec::new(),
        }
    }

    /// Register a work retrievable by DOI (normalized on insert).
    pub fn with_work(mut self, doi: &str, work: ProviderWork) -> Self {
        self.works_by_doi.insert(normalize_doi(doi), work);
        self
    }

    /// Set the results every search returns.
    pub fn with_search_results(mut self, results: Vec<ProviderWork>) -> Self {
        self.search_results = results;
        self
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn work_by_doi(&self, doi: &str) -> Option<ProviderWork> {
        self.works_by_doi.get(&normalize_doi(doi)).cloned()
    }

    async fn search(&self, _query: &str) -> Vec<ProviderWork> {
        self.search_results.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_normalizes_doi() {
        let provider = StaticMetadataProvider::new("crossref").with_work(
            "https://doi.org/10.1234/ABCD",
            ProviderWork::named("crossref"),
        );
        assert!(provider.work_by_doi("10.1234/abcd").await.is_some());
        assert!(provider.work_by_doi("10.9999/none").await.is_none());
    }

    #[tokio::test]
    async fn search_returns_configured_results() {
        let provider = StaticMetadataProvider::new("openalex")
            .with_search_results(vec![ProviderWork::named("openalex")]);
        assert_eq!(provider.search("anything").await.len(), 1);
    }
}
