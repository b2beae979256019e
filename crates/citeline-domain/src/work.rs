//! Normalized work records returned by metadata providers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bibliographic work as reported by one metadata provider.
///
/// Providers normalize their payloads into this shape so the resolver and
/// verifier never see provider-specific JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderWork {
    /// Name of the reporting provider (e.g. `crossref`)
    pub provider: String,
    /// The provider's own id for the work
    pub provider_id: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Authors, display names
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication year
    pub year: Option<i32>,
    /// Venue
    pub venue: Option<String>,
    /// Normalized DOI
    pub doi: Option<String>,
    /// Landing URL
    pub url: Option<String>,
    /// Abstract, when the provider exposes one
    pub abstract_text: Option<String>,
    /// Additional identifiers keyed by name (`openalex_id`, `s2_paper_id`, ...)
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
    /// Integrity status flags reported by the provider
    /// (`retracted`, `corrected`, `eoc`)
    #[serde(default)]
    pub status_flags: Vec<String>,
}

impl ProviderWork {
    /// A minimal work record for the given provider.
    pub fn named(provider: impl Into<String>) -> Self {
        Self { provider: provider.into(), ..Self::default() }
    }
}
