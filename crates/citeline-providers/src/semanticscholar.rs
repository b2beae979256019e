//! Semantic Scholar graph API client

use crate::http::JsonFetcher;
use crate::{normalize_doi, ProviderConfig};
use async_trait::async_trait;
use citeline_domain::traits::MetadataProvider;
use citeline_domain::ProviderWork;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1/paper";
const FIELDS: &str = "title,authors,year,venue,externalIds,url";

/// Client for the Semantic Scholar graph API.
pub struct SemanticScholarClient {
    fetcher: JsonFetcher,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    /// Build a client with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let api_key = config.semanticscholar_api_key.clone();
        Self { fetcher: JsonFetcher::new(config), api_key }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match &self.api_key {
            Some(key) => vec![("x-api-key", key.as_str())],
            None => Vec::new(),
        }
    }

    fn to_work(item: &Value) -> ProviderWork {
        let title = item.get("title").and_then(Value::as_str).map(str::to_string);
        let mut authors = Vec::new();
        if let Some(items) = item.get("authors").and_then(Value::as_array) {
            for author in items {
                if let Some(name) = author.get("name").and_then(Value::as_str) {
                    authors.push(name.to_string());
                }
            }
        }
        let year = item.get("year").and_then(Value::as_i64).map(|y| y as i32);
        let venue = item.get("venue").and_then(Value::as_str).map(str::to_string);
        let doi = item
            .get("externalIds")
            .and_then(|ids| ids.get("DOI"))
            .and_then(Value::as_str)
            .map(normalize_doi);
        let paper_id = item.get("paperId").and_then(Value::as_str).map(str::to_string);
        let mut identifiers = BTreeMap::new();
        if let Some(doi) = &doi {
            identifiers.insert("doi".to_string(), doi.clone());
        }
        if let Some(id) = &paper_id {
            identifiers.insert("s2_paper_id".to_string(), id.clone());
        }
        ProviderWork {
            provider: "semanticscholar".to_string(),
            provider_id: paper_id,
            title,
            authors,
            year,
            venue,
            doi,
            url: item.get("url").and_then(Value::as_str).map(str::to_string),
            abstract_text: None,
            identifiers,
            status_flags: Vec::new(),
        }
    }
}

#[async_trait]
impl MetadataProvider for SemanticScholarClient {
    fn name(&self) -> &str {
        "semanticscholar"
    }

    async fn work_by_doi(&self, doi: &str) -> Option<ProviderWork> {
        let normalized = normalize_doi(doi);
        let url = format!("{}/DOI:{}", BASE_URL, normalized);
        let result = self
            .fetcher
            .get_json_with_headers(&url, &[("fields", FIELDS)], &self.headers())
            .await;
        match result {
            Ok(payload) if payload.is_object() => Some(Self::to_work(&payload)),
            Ok(_) => None,
            Err(e) => {
                debug!(doi = %normalized, error = %e, "semanticscholar lookup miss");
                None
            }
        }
    }

    async fn search(&self, query: &str) -> Vec<ProviderWork> {
        let url = format!("{}/search", BASE_URL);
        let result = self
            .fetcher
            .get_json_with_headers(
                &url,
                &[("query", query), ("limit", "5"), ("fields", FIELDS)],
                &self.headers(),
            )
            .await;
        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                debug!(query, error = %e, "semanticscholar search miss");
                return Vec::new();
            }
        };
        payload
            .get("data")
            .and_then(Value::as_array)
            .map(|data| {
                data.iter()
                    .filter(|item| item.is_object())
                    .map(Self::to_work)
                    .collect()
            })
            .unwrap_or_default()
    }
}
