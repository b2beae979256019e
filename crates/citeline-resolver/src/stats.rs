//! Resolution statistics
//!
//! Observability only: nothing downstream routes on these numbers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate counters for one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Candidates processed (before dedup)
    pub total: usize,
    /// Kept records whose canonical id is DOI-prefixed
    pub doi_confirmed: usize,
    /// Kept records cited with the preprint-only label
    pub preprint_only: usize,
    /// Successful lookups per provider
    pub provider_hits: BTreeMap<String, u32>,
    /// Missed lookups per provider
    pub provider_misses: BTreeMap<String, u32>,
}

impl ResolveStats {
    /// Record the outcome of one provider lookup.
    pub fn track(&mut self, provider: &str, hit: bool) {
        let tally = if hit { &mut self.provider_hits } else { &mut self.provider_misses };
        *tally.entry(provider.to_string()).or_insert(0) += 1;
    }

    /// Render a short summary line for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} candidates, {} doi-confirmed, {} preprint-only",
            self.total, self.doi_confirmed, self.preprint_only
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_accumulates_hits_and_misses() {
        let mut stats = ResolveStats::default();
        stats.track("crossref", true);
        stats.track("crossref", true);
        stats.track("openalex", false);
        assert_eq!(stats.provider_hits.get("crossref"), Some(&2));
        assert_eq!(stats.provider_misses.get("openalex"), Some(&1));
        assert_eq!(stats.provider_hits.get("openalex"), None);
    }
}
