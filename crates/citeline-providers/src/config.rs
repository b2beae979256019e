//! Provider client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shared configuration for all metadata provider clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Per-request timeout in seconds
    pub request_timeout_s: f64,
    /// Retries after the first attempt
    pub request_retry_count: u32,
    /// Base delay for linear backoff (`base × attempt_number`) in seconds
    pub retry_base_delay_s: f64,
    /// Contact email sent to OpenAlex (`mailto` parameter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openalex_mailto: Option<String>,
    /// Contact email required by Unpaywall; the client reports misses
    /// when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpaywall_email: Option<String>,
    /// Optional Semantic Scholar API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semanticscholar_api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            request_timeout_s: 20.0,
            request_retry_count: 2,
            retry_base_delay_s: 1.0,
            openalex_mailto: None,
            unpaywall_email: None,
            semanticscholar_api_key: None,
        }
    }
}

impl ProviderConfig {
    /// Request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_s)
    }

    /// Backoff delay before the given retry attempt (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.retry_base_delay_s * attempt as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear() {
        let config = ProviderConfig { retry_base_delay_s: 0.5, ..Default::default() };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(1500));
    }
}
