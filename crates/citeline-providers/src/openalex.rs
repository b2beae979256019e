//! OpenAlex works client

use crate::http::JsonFetcher;
use crate::{normalize_doi, ProviderConfig};
use async_trait::async_trait;
use citeline_domain::traits::MetadataProvider;
use citeline_domain::ProviderWork;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const BASE_URL: &str = "https://api.openalex.org/works";

/// Client for the OpenAlex works API.
pub struct OpenAlexClient {
    fetcher: JsonFetcher,
    mailto: Option<String>,
}

impl OpenAlexClient {
    /// Build a client with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let mailto = config.openalex_mailto.clone();
        Self { fetcher: JsonFetcher::new(config), mailto }
    }

    fn to_work(item: &Value) -> ProviderWork {
        let title = item.get("title").and_then(Value::as_str).map(str::to_string);
        let mut authors = Vec::new();
        if let Some(authorships) = item.get("authorships").and_then(Value::as_array) {
            for authorship in authorships {
                if let Some(name) = authorship
                    .get("author")
                    .and_then(|a| a.get("display_name"))
                    .and_then(Value::as_str)
                {
                    authors.push(name.to_string());
                }
            }
        }
        let year = item
            .get("publication_year")
            .and_then(Value::as_i64)
            .map(|y| y as i32);
        let venue = item
            .get("host_venue")
            .and_then(|h| h.get("display_name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let doi = item
            .get("doi")
            .and_then(Value::as_str)
            .map(normalize_doi);
        let openalex_id = item.get("id").and_then(Value::as_str).map(str::to_string);
        let url = openalex_id
            .clone()
            .or_else(|| doi.clone());
        let mut identifiers = BTreeMap::new();
        if let Some(doi) = &doi {
            identifiers.insert("doi".to_string(), doi.clone());
        }
        if let Some(id) = &openalex_id {
            identifiers.insert("openalex_id".to_string(), id.clone());
        }
        let mut status_flags = Vec::new();
        if item.get("is_retracted").and_then(Value::as_bool) == Some(true) {
            status_flags.push("retracted".to_string());
        }
        ProviderWork {
            provider: "openalex".to_string(),
            provider_id: openalex_id,
            title,
            authors,
            year,
            venue,
            doi,
            url,
            abstract_text: None,
            identifiers,
            status_flags,
        }
    }

    fn query_params<'a>(&'a self, base: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut params = base.to_vec();
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.as_str()));
        }
        params
    }
}

#[async_trait]
impl MetadataProvider for OpenAlexClient {
    fn name(&self) -> &str {
        "openalex"
    }

    async fn work_by_doi(&self, doi: &str) -> Option<ProviderWork> {
        let normalized = normalize_doi(doi);
        let url = format!("{}/https://doi.org/{}", BASE_URL, normalized);
        let params = self.query_params(&[]);
        match self.fetcher.get_json(&url, &params).await {
            Ok(payload) if payload.is_object() => Some(Self::to_work(&payload)),
            Ok(_) => None,
            Err(e) => {
                debug!(doi = %normalized, error = %e, "openalex lookup miss");
                None
            }
        }
    }

    async fn search(&self, query: &str) -> Vec<ProviderWork> {
        let params = self.query_params(&[("search", query), ("per-page", "5")]);
        let payload = match self.fetcher.get_json(BASE_URL, &params).await {
            Ok(payload) => payload,
            Err(e) => {
                debug!(query, error = %e, "openalex search miss");
                return Vec::new();
            }
        };
        payload
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .filter(|item| item.is_object())
                    .map(Self::to_work)
                    .collect()
            })
            .unwrap_or_default()
    }
}
