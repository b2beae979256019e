//! Evidence snippets extracted from sources

use serde::{Deserialize, Serialize};

/// A snippet of source text supporting one claim in one chapter.
///
/// Many evidence items may reference the same source; a chapter is
/// "covered" iff at least one item names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Claim identifier, unique within the run (e.g. `C1-C001`)
    pub claim_id: String,
    /// Canonical id of the supporting source
    pub source_id: String,
    /// Quoted or summarized snippet
    pub snippet: String,
    /// Where in the source the snippet comes from (e.g. `abstract`)
    pub locator: Option<String>,
    /// Relevance estimate in [0, 1]
    pub relevance_score: f64,
    /// Chapter this item supports
    pub chapter_id: Option<String>,
}
