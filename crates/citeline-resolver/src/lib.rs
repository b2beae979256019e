//! Citeline Source Resolver
//!
//! Promotes loosely-identified retrieval candidates into canonical,
//! DOI-first records by querying metadata providers in a fixed priority
//! order, then deduplicates on the canonical id (first occurrence wins).

#![warn(missing_docs)]

mod resolver;
mod stats;

pub use resolver::{extract_doi, extract_preprint_id, Resolver};
pub use stats::ResolveStats;
