//! Pipeline configuration

use citeline_providers::ProviderConfig;
use citeline_verifier::IntegrityMode;
use serde::{Deserialize, Serialize};
use std::env;

/// How citation-gate failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationAuditMode {
    /// Citation issues fail the gate and trigger retry routing
    #[default]
    Hard,
    /// Citation issues become warnings and the gate passes
    Soft,
}

/// Runtime configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Gate-triggered retry traversals allowed before forcing terminal
    pub max_iterations: u32,
    /// Cap on the retained candidate pool
    pub max_sources: usize,
    /// Queries executed per chapter during retrieval
    pub max_queries_per_chapter: usize,
    /// Queries are truncated to this many characters
    pub max_query_length: usize,
    /// Concurrent provider/generator calls inside one node
    pub max_concurrency: usize,
    /// Retraction handling
    pub integrity_mode: IntegrityMode,
    /// Citation-gate handling
    pub citation_audit_mode: CitationAuditMode,
    /// Use deterministic collaborators instead of live services
    pub mock_mode: bool,
    /// Provider client settings
    pub provider: ProviderConfig,
    /// Generation backend endpoint (Ollama-compatible)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_endpoint: Option<String>,
    /// Generation model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_model: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            max_sources: 20,
            max_queries_per_chapter: 3,
            max_query_length: 200,
            max_concurrency: 6,
            integrity_mode: IntegrityMode::Strict,
            citation_audit_mode: CitationAuditMode::Hard,
            mock_mode: true,
            provider: ProviderConfig::default(),
            generator_endpoint: None,
            generator_model: None,
        }
    }
}

impl PipelineConfig {
    /// Build a configuration from `CITELINE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_iterations: env_parse("CITELINE_MAX_ITERATIONS", defaults.max_iterations),
            max_sources: env_parse("CITELINE_MAX_SOURCES", defaults.max_sources),
            max_queries_per_chapter: env_parse(
                "CITELINE_MAX_QUERIES_PER_CHAPTER",
                defaults.max_queries_per_chapter,
            ),
            max_query_length: env_parse("CITELINE_MAX_QUERY_LENGTH", defaults.max_query_length),
            max_concurrency: env_parse("CITELINE_MAX_CONCURRENCY", defaults.max_concurrency),
            integrity_mode: match env::var("CITELINE_INTEGRITY_MODE").as_deref() {
                Ok("lenient") => IntegrityMode::Lenient,
                _ => IntegrityMode::Strict,
            },
            citation_audit_mode: match env::var("CITELINE_CITATION_AUDIT_MODE").as_deref() {
                Ok("soft") => CitationAuditMode::Soft,
                _ => CitationAuditMode::Hard,
            },
            mock_mode: env::var("CITELINE_MOCK_MODE")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.mock_mode),
            provider: ProviderConfig {
                request_timeout_s: env_parse(
                    "CITELINE_REQUEST_TIMEOUT_S",
                    defaults.provider.request_timeout_s,
                ),
                request_retry_count: env_parse(
                    "CITELINE_REQUEST_RETRY_COUNT",
                    defaults.provider.request_retry_count,
                ),
                retry_base_delay_s: env_parse(
                    "CITELINE_RETRY_BASE_DELAY_S",
                    defaults.provider.retry_base_delay_s,
                ),
                openalex_mailto: env::var("CITELINE_OPENALEX_MAILTO").ok(),
                unpaywall_email: env::var("CITELINE_UNPAYWALL_EMAIL").ok(),
                semanticscholar_api_key: env::var("CITELINE_S2_API_KEY").ok(),
            },
            generator_endpoint: env::var("CITELINE_GENERATOR_ENDPOINT").ok(),
            generator_model: env::var("CITELINE_GENERATOR_MODEL").ok(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.max_sources, 20);
        assert_eq!(config.max_concurrency, 6);
        assert!(config.mock_mode);
        assert_eq!(config.integrity_mode, IntegrityMode::Strict);
        assert_eq!(config.citation_audit_mode, CitationAuditMode::Hard);
    }
}
