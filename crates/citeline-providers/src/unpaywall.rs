//! Unpaywall open-access locator client
//!
//! Unpaywall only contributes an open-access URL. It never participates in
//! identity consensus, and it requires a contact email; without one the
//! client reports misses.

use crate::http::JsonFetcher;
use crate::{normalize_doi, ProviderConfig};
use async_trait::async_trait;
use citeline_domain::traits::MetadataProvider;
use citeline_domain::ProviderWork;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const BASE_URL: &str = "https://api.unpaywall.org/v2";

/// Client for the Unpaywall API.
pub struct UnpaywallClient {
    fetcher: JsonFetcher,
    email: Option<String>,
}

impl UnpaywallClient {
    /// Build a client with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let email = config.unpaywall_email.clone();
        Self { fetcher: JsonFetcher::new(config), email }
    }

    fn to_work(item: &Value, doi: &str) -> ProviderWork {
        let url = item
            .get("best_oa_location")
            .and_then(|loc| loc.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let mut identifiers = BTreeMap::new();
        identifiers.insert("doi".to_string(), doi.to_string());
        ProviderWork {
            provider: "unpaywall".to_string(),
            provider_id: Some(doi.to_string()),
            title: item.get("title").and_then(Value::as_str).map(str::to_string),
            doi: Some(doi.to_string()),
            url,
            identifiers,
            ..ProviderWork::default()
        }
    }
}

#[async_trait]
impl MetadataProvider for UnpaywallClient {
    fn name(&self) -> &str {
        "unpaywall"
    }

    async fn work_by_doi(&self, doi: &str) -> Option<ProviderWork> {
        let email = self.email.as_deref()?;
        let normalized = normalize_doi(doi);
        let url = format!("{}/{}", BASE_URL, normalized);
        match self.fetcher.get_json(&url, &[("email", email)]).await {
            Ok(payload) if payload.is_object() => Some(Self::to_work(&payload, &normalized)),
            Ok(_) => None,
            Err(e) => {
                debug!(doi = %normalized, error = %e, "unpaywall lookup miss");
                None
            }
        }
    }

    async fn search(&self, _query: &str) -> Vec<ProviderWork> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_best_oa_location() {
        let item = json!({
            "title": "Some Paper",
            "best_oa_location": {"url": "https://repo.example.org/paper.pdf"}
        });
        let work = UnpaywallClient::to_work(&item, "10.1234/abcd");
        assert_eq!(work.url.as_deref(), Some("https://repo.example.org/paper.pdf"));
        assert_eq!(work.doi.as_deref(), Some("10.1234/abcd"));
    }

    #[tokio::test]
    async fn missing_email_is_a_miss() {
        let client = UnpaywallClient::new(ProviderConfig::default());
        assert!(client.work_by_doi("10.1234/abcd").await.is_none());
    }
}
