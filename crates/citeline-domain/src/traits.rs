//! Trait interfaces for external collaborators
//!
//! The pipeline core only ever talks to the outside world through these
//! seams. Infrastructure crates provide the HTTP-backed implementations;
//! tests and mock mode substitute deterministic ones.

use crate::source::SourceRecord;
use crate::work::ProviderWork;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// A lazy, finite, non-restartable stream of text deltas from a generator.
pub type DeltaStream = BoxStream<'static, String>;

/// Error surfaced by a text-generation collaborator.
///
/// Callers recover locally (typed fallback); this error never crosses a
/// stage boundary.
#[derive(Debug, Clone)]
pub struct GenerationError(
    /// Description of the failure
    pub String,
);

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation failed: {}", self.0)
    }
}

impl std::error::Error for GenerationError {}

/// A text-generation capability: prompt in, delta stream out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Start generating for the prompt, yielding text deltas.
    async fn generate(&self, prompt: &str) -> Result<DeltaStream, GenerationError>;
}

/// An independent bibliographic metadata service.
///
/// Misses are absences, never errors: implementations convert exhausted
/// retries and malformed payloads into `None` / empty results so a
/// provider outage degrades confidence signals instead of crashing a run.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Stable provider name used in consensus and hit/miss accounting.
    fn name(&self) -> &str;

    /// Look up a work by DOI.
    async fn work_by_doi(&self, doi: &str) -> Option<ProviderWork>;

    /// Full-text search for works.
    async fn search(&self, query: &str) -> Vec<ProviderWork>;
}

/// A literature search collaborator returning raw candidate stubs.
#[async_trait]
pub trait LiteratureSearch: Send + Sync {
    /// Search for candidate sources matching the query.
    async fn search(&self, query: &str, limit: usize) -> Vec<SourceRecord>;
}

/// Optional observer for stage lifecycle events.
///
/// Purely observational: implementations must not block and must swallow
/// their own failures. An emit can never fail the run.
pub trait EventSink: Send + Sync {
    /// Report an event from the named stage.
    fn emit(&self, stage: &str, message: &str, payload: Option<serde_json::Value>);
}

/// An EventSink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _stage: &str, _message: &str, _payload: Option<serde_json::Value>) {}
}
