//! Crossref works client
//!
//! Crossref is the first identity provider in the lookup order and the
//! only integrity-status source: retraction, correction and
//! expression-of-concern markers are read from its relation and update-to
//! fields.

use crate::http::{first_string, JsonFetcher};
use crate::{normalize_doi, ProviderConfig};
use async_trait::async_trait;
use citeline_domain::traits::MetadataProvider;
use citeline_domain::ProviderWork;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const BASE_URL: &str = "https://api.crossref.org/works";

/// Client for the Crossref works API.
pub struct CrossrefClient {
    fetcher: JsonFetcher,
}

impl CrossrefClient {
    /// Build a client with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        Self { fetcher: JsonFetcher::new(config) }
    }

    fn to_work(message: &Value, doi: Option<String>) -> ProviderWork {
        let title = first_string(message.get("title"));
        let mut authors = Vec::new();
        if let Some(items) = message.get("author").and_then(Value::as_array) {
            for author in items {
                let given = author.get("given").and_then(Value::as_str).unwrap_or("").trim();
                let family = author.get("family").and_then(Value::as_str).unwrap_or("").trim();
                let combined = [given, family]
                    .iter()
                    .filter(|part| !part.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
                if !combined.is_empty() {
                    authors.push(combined);
                }
            }
        }
        let year = message
            .get("issued")
            .and_then(|v| v.get("date-parts"))
            .and_then(Value::as_array)
            .and_then(|parts| parts.first())
            .and_then(Value::as_array)
            .and_then(|first| first.first())
            .and_then(Value::as_i64)
            .map(|y| y as i32);
        let venue = first_string(message.get("container-title"));
        let url = message.get("URL").and_then(Value::as_str).map(str::to_string);
        let mut identifiers = BTreeMap::new();
        if let Some(doi) = &doi {
            identifiers.insert("doi".to_string(), doi.clone());
        }
        ProviderWork {
            provider: "crossref".to_string(),
            provider_id: message
                .get("DOI")
                .or_else(|| message.get("doi"))
                .and_then(Value::as_str)
                .map(str::to_string),
            title,
            authors,
            year,
            venue,
            doi,
            url,
            abstract_text: None,
            identifiers,
            status_flags: status_flags(message),
        }
    }
}

#[async_trait]
impl MetadataProvider for CrossrefClient {
    fn name(&self) -> &str {
        "crossref"
    }

    async fn work_by_doi(&self, doi: &str) -> Option<ProviderWork> {
        let normalized = normalize_doi(doi);
        let url = format!("{}/{}", BASE_URL, normalized);
        let payload = match self.fetcher.get_json(&url, &[]).await {
            Ok(payload) => payload,
            Err(e) => {
                debug!(doi = %normalized, error = %e, "crossref lookup miss");
                return None;
            }
        };
        let message = payload.get("message")?;
        if !message.is_object() {
            return None;
        }
        Some(Self::to_work(message, Some(normalized)))
    }

    async fn search(&self, query: &str) -> Vec<ProviderWork> {
        let payload = match self.fetcher.get_json(BASE_URL, &[("query", query), ("rows", "5")]).await
        {
            Ok(payload) => payload,
            Err(e) => {
                debug!(query, error = %e, "crossref search miss");
                return Vec::new();
            }
        };
        let items = payload
            .get("message")
            .and_then(|m| m.get("items"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        items
            .iter()
            .filter(|item| item.is_object())
            .map(|item| {
                let doi = item
                    .get("DOI")
                    .or_else(|| item.get("doi"))
                    .and_then(Value::as_str)
                    .map(normalize_doi);
                Self::to_work(item, doi)
            })
            .collect()
    }
}

/// Integrity flags from Crossref relation and update-to markers.
fn status_flags(message: &Value) -> Vec<String> {
    let mut flags = Vec::new();
    let mut push_from = |label: &str| {
        let lowered = label.to_lowercase();
        if lowered.contains("retract") {
            flags.push("retracted".to_string());
        }
        if lowered.contains("correct") {
            flags.push("corrected".to_string());
        }
        if lowered.contains("concern") {
            flags.push("eoc".to_string());
        }
    };
    if let Some(relations) = message.get("relation").and_then(Value::as_object) {
        for (rel_type, rel_items) in relations {
            if rel_items.is_array() {
                push_from(rel_type);
            }
        }
    }
    if let Some(updates) = message.get("update-to").and_then(Value::as_array) {
        for update in updates {
            if let Some(update_type) = update.get("type").and_then(Value::as_str) {
                push_from(update_type);
            }
        }
    }
    flags.sort();
    flags.dedup();
    flags
}
