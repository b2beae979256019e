//! Shared JSON request helper with retry and linear backoff

use crate::{ProviderConfig, ProviderError};
use serde_json::Value;
use tracing::debug;

/// User-Agent sent with every provider request.
pub const USER_AGENT: &str = "citeline";

/// Thin wrapper over a reqwest client carrying the retry policy.
#[derive(Clone)]
pub struct JsonFetcher {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl JsonFetcher {
    /// Build a fetcher with the configured timeout.
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// GET a JSON document, retrying with linear backoff.
    ///
    /// Exhausting retries yields the last error; callers translate that
    /// into a miss rather than propagating it.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ProviderError> {
        self.get_json_with_headers(url, params, &[]).await
    }

    /// GET a JSON document with extra headers, retrying with linear backoff.
    pub async fn get_json_with_headers(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, ProviderError> {
        let mut last_error = ProviderError::Request("no attempt made".to_string());
        for attempt in 0..=self.config.request_retry_count {
            let mut request = self.client.get(url).query(params);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| ProviderError::Payload(e.to_string()));
                    }
                    last_error = ProviderError::Status(status.as_u16());
                }
                Err(e) => {
                    last_error = ProviderError::Request(e.to_string());
                }
            }
            if attempt < self.config.request_retry_count {
                let delay = self.config.backoff_delay(attempt + 1);
                debug!(url, attempt, ?delay, "provider request failed, backing off");
                tokio::time::sleep(delay).await;
            }
        }
        Err(last_error)
    }
}

/// First string out of a value that may be a string or an array of strings.
pub(crate) fn first_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(items) => items
            .first()
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_string_handles_both_shapes() {
        let single = json!("  A Title ");
        let list = json!(["First", "Second"]);
        let number = json!(42);
        assert_eq!(first_string(Some(&single)), Some("A Title".to_string()));
        assert_eq!(first_string(Some(&list)), Some("First".to_string()));
        assert_eq!(first_string(Some(&number)), None);
        assert_eq!(first_string(None), None);
    }
}
