//! Candidate and resolved source records

use crate::verification::{IntegrityStatus, VerificationOutcome};
use serde::{Deserialize, Serialize};

/// Broad classification of where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Peer-reviewed or preprint paper
    Paper,
    /// Technical or institutional report
    Report,
    /// Official publication (standards body, agency)
    Official,
    /// Generic web material
    Web,
}

impl SourceType {
    /// Primary source types are citable on their own authority.
    pub fn is_primary(&self) -> bool {
        matches!(self, SourceType::Paper | SourceType::Report | SourceType::Official)
    }
}

/// Identifiers accumulated for a source across resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifierSet {
    /// Digital Object Identifier, normalized (no scheme prefix, lowercased)
    pub doi: Option<String>,
    /// Preprint identifier (e.g. an arXiv id)
    pub preprint_id: Option<String>,
    /// OpenAlex work id
    pub openalex_id: Option<String>,
    /// Semantic Scholar paper id
    pub s2_paper_id: Option<String>,
}

/// Provider-confirmed bibliographic snapshot for a resolved source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMetadata {
    /// Confirmed title
    pub title: Option<String>,
    /// Confirmed author list
    pub authors: Vec<String>,
    /// Publication year
    pub year: Option<i32>,
    /// Venue (journal, conference, repository)
    pub venue: Option<String>,
    /// Confirmed DOI
    pub doi: Option<String>,
    /// Landing URL reported by the confirming provider
    pub url: Option<String>,
}

/// Links a reader can follow to the source material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceLinks {
    /// Publisher or repository landing page
    pub landing_page_url: Option<String>,
    /// Open-access copy located independently of the publisher
    pub oa_url: Option<String>,
}

/// A candidate or resolved reference flowing through a run.
///
/// Retrieval produces these as loosely-identified stubs; the resolver
/// promotes them to a canonical, DOI-first identity. Once `canonical_id`
/// is set it is stable for the remainder of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Raw identifier assigned at retrieval time
    pub source_id: String,
    /// Title as retrieved
    pub title: String,
    /// Authors as retrieved
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication year as retrieved
    pub year: Option<i32>,
    /// Venue as retrieved
    pub venue: Option<String>,
    /// Self-reported DOI, if any
    pub doi: Option<String>,
    /// Self-reported URL, if any
    pub url: Option<String>,
    /// Abstract text, if retrieved
    pub abstract_text: Option<String>,
    /// Classification of the source
    pub source_type: SourceType,
    /// Retrieval timestamp (RFC 3339), recorded for observability
    pub retrieved_at: Option<String>,
    /// Identifiers accumulated during resolution
    #[serde(default)]
    pub identifiers: IdentifierSet,
    /// Canonical identity string, set by the resolver
    pub canonical_id: Option<String>,
    /// Provider-confirmed metadata snapshot
    pub canonical_metadata: Option<CanonicalMetadata>,
    /// Consensus verification outcome, set by the verifier
    pub verification: Option<VerificationOutcome>,
    /// Integrity flags, set by the status checker
    pub status: Option<IntegrityStatus>,
    /// Landing/open-access links assembled during resolution
    pub evidence_links: Option<EvidenceLinks>,
    /// True when no confirmed DOI exists and the source is cited with
    /// reduced trust
    #[serde(default)]
    pub preprint_only: bool,
}

impl SourceRecord {
    /// Build a bare candidate stub, as the literature search returns them.
    pub fn stub(source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            doi: None,
            url: None,
            abstract_text: None,
            source_type: SourceType::Paper,
            retrieved_at: None,
            identifiers: IdentifierSet::default(),
            canonical_id: None,
            canonical_metadata: None,
            verification: None,
            status: None,
            evidence_links: None,
            preprint_only: false,
        }
    }

    /// The identity the rest of the pipeline should cite: canonical when
    /// resolved, otherwise the raw retrieval id.
    pub fn cite_id(&self) -> &str {
        self.canonical_id.as_deref().unwrap_or(&self.source_id)
    }

    /// Whether any locator (DOI, URL, landing page or OA link) exists.
    pub fn has_resolvable_locator(&self) -> bool {
        if self.doi.is_some() || self.url.is_some() {
            return true;
        }
        if let Some(meta) = &self.canonical_metadata {
            if meta.doi.is_some() || meta.url.is_some() {
                return true;
            }
        }
        if let Some(links) = &self.evidence_links {
            if links.landing_page_url.is_some() || links.oa_url.is_some() {
                return true;
            }
        }
        false
    }

    /// Whether this is a primary source (paper/report/official).
    pub fn is_primary(&self) -> bool {
        self.source_type.is_primary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_has_no_locator() {
        let source = SourceRecord::stub("S-0001", "A title");
        assert!(!source.has_resolvable_locator());
    }

    #[test]
    fn doi_counts_as_locator() {
        let mut source = SourceRecord::stub("S-0001", "A title");
        source.doi = Some("10.1234/abcd".to_string());
        assert!(source.has_resolvable_locator());
    }

    #[test]
    fn oa_link_counts_as_locator() {
        let mut source = SourceRecord::stub("S-0001", "A title");
        source.evidence_links = Some(EvidenceLinks {
            landing_page_url: None,
            oa_url: Some("https://example.org/oa.pdf".to_string()),
        });
        assert!(source.has_resolvable_locator());
    }

    #[test]
    fn web_sources_are_not_primary() {
        let mut source = SourceRecord::stub("S-0001", "A title");
        source.source_type = SourceType::Web;
        assert!(!source.is_primary());
        source.source_type = SourceType::Official;
        assert!(source.is_primary());
    }

    #[test]
    fn cite_id_prefers_canonical() {
        let mut source = SourceRecord::stub("S-0001", "A title");
        assert_eq!(source.cite_id(), "S-0001");
        source.canonical_id = Some("doi:10.1234/abcd".to_string());
        assert_eq!(source.cite_id(), "doi:10.1234/abcd");
    }
}
