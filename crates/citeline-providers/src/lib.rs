//! Citeline Metadata Provider Layer
//!
//! HTTP clients for the bibliographic metadata services the resolver and
//! verifier corroborate against, each implementing the
//! `MetadataProvider` trait from `citeline-domain`.
//!
//! # Providers
//!
//! - `CrossrefClient`: Crossref works API, also the integrity-status source
//! - `OpenAlexClient`: OpenAlex works and search
//! - `SemanticScholarClient`: Semantic Scholar graph API
//! - `UnpaywallClient`: open-access location only, no identity role
//! - `StaticMetadataProvider`: deterministic in-memory provider for tests
//!   and mock mode
//!
//! All clients convert exhausted retries and malformed payloads into
//! misses (`None` / empty vec). A provider outage degrades confidence and
//! coverage signals; it never fails a run.

#![warn(missing_docs)]

pub mod config;
pub mod crossref;
pub mod http;
pub mod openalex;
pub mod search;
pub mod semanticscholar;
pub mod statics;
pub mod unpaywall;

use citeline_domain::traits::MetadataProvider;
use std::sync::Arc;
use thiserror::Error;

pub use config::ProviderConfig;
pub use crossref::CrossrefClient;
pub use openalex::OpenAlexClient;
pub use search::{ScholarSearchClient, StaticSearch};
pub use semanticscholar::SemanticScholarClient;
pub use statics::StaticMetadataProvider;
pub use unpaywall::UnpaywallClient;

/// Errors that can occur while talking to a metadata service.
///
/// These stay inside the provider layer: public lookup methods translate
/// them into misses.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network or HTTP-level failure after all retries
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status
    #[error("HTTP {0}")]
    Status(u16),

    /// The payload was not the JSON shape the client expected
    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// Strip DOI scheme prefixes and lowercase.
pub fn normalize_doi(doi: &str) -> String {
    doi.trim()
        .to_lowercase()
        .replace("https://doi.org/", "")
        .replace("http://doi.org/", "")
}

/// The fixed set of providers a run consults.
///
/// Identity lookups walk `crossref → openalex → semanticscholar`; text
/// searches use `openalex` and `semanticscholar`; `oa_locator` is queried
/// only for an open-access URL and plays no identity role.
#[derive(Clone)]
pub struct ProviderSet {
    /// Primary identity and integrity-status provider
    pub crossref: Arc<dyn MetadataProvider>,
    /// Second identity provider and first search provider
    pub openalex: Arc<dyn MetadataProvider>,
    /// Third identity provider and second search provider
    pub semanticscholar: Arc<dyn MetadataProvider>,
    /// Open-access locator (Unpaywall)
    pub oa_locator: Arc<dyn MetadataProvider>,
}

impl ProviderSet {
    /// Build the live HTTP-backed provider set.
    pub fn live(config: &ProviderConfig) -> Self {
        Self {
            crossref: Arc::new(CrossrefClient::new(config.clone())),
            openalex: Arc::new(OpenAlexClient::new(config.clone())),
            semanticscholar: Arc::new(SemanticScholarClient::new(config.clone())),
            oa_locator: Arc::new(UnpaywallClient::new(config.clone())),
        }
    }

    /// Identity providers in fixed lookup priority order.
    pub fn doi_lookup_order(&self) -> [&Arc<dyn MetadataProvider>; 3] {
        [&self.crossref, &self.openalex, &self.semanticscholar]
    }

    /// Providers used for text-query search.
    pub fn search_providers(&self) -> [&Arc<dyn MetadataProvider>; 2] {
        [&self.openalex, &self.semanticscholar]
    }
}
