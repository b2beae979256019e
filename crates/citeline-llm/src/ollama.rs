//! Ollama generator implementation
//!
//! Streams deltas from a local Ollama instance's generate API. The NDJSON
//! response lines are decoded incrementally so consumers see deltas as
//! they arrive rather than one final block.

use crate::LlmError;
use async_trait::async_trait;
use citeline_domain::traits::{DeltaStream, GenerationError, TextGenerator};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for generation requests (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of retry attempts for establishing the request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for linear retry backoff
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Streaming Ollama API generator.
pub struct OllamaGenerator {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
    retry_base_delay: Duration,
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

impl OllamaGenerator {
    /// Create a generator for the given endpoint and model.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }

    /// Create a generator against the default local endpoint.
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for linear retry backoff.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    async fn send_request(&self, prompt: &str) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: true,
        };

        let mut attempts = 0;
        let mut last_error = None;
        while attempts < self.max_retries {
            match self.client.post(&url).json(&body).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }
                    if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    }
                    let status = response.status();
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error =
                        Some(LlmError::Communication(format!("HTTP {}: {}", status, error_text)));
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }
            attempts += 1;
            if attempts < self.max_retries {
                tokio::time::sleep(self.retry_base_delay * attempts).await;
            }
        }
        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<DeltaStream, GenerationError> {
        let response = self.send_request(prompt).await.map_err(GenerationError::from)?;
        Ok(delta_stream(response.bytes_stream()))
    }
}

/// Decode an NDJSON byte stream into text deltas.
///
/// Lines may be split across network chunks; a carry buffer reassembles
/// them. Undecodable lines are skipped, and the stream ends at the `done`
/// marker or when the transport closes.
fn delta_stream(
    bytes: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> DeltaStream {
    let state = (Box::pin(bytes), String::new(), false);
    futures::stream::unfold(state, |(mut bytes, mut buffer, mut finished)| async move {
        loop {
            if finished && buffer.is_empty() {
                return None;
            }
            if let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<OllamaChunk>(line) {
                    Ok(chunk) => {
                        if chunk.done {
                            finished = true;
                            buffer.clear();
                        }
                        if chunk.response.is_empty() {
                            continue;
                        }
                        return Some((chunk.response, (bytes, buffer, finished)));
                    }
                    Err(_) => continue,
                }
            }
            if finished {
                buffer.clear();
                continue;
            }
            match bytes.next().await {
                Some(Ok(piece)) => buffer.push_str(&String::from_utf8_lossy(&piece)),
                Some(Err(_)) | None => {
                    finished = true;
                    if !buffer.ends_with('\n') {
                        buffer.push('\n');
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect_text;

    fn chunked(pieces: Vec<&'static str>) -> DeltaStream {
        let byte_stream = futures::stream::iter(
            pieces
                .into_iter()
                .map(|piece| Ok(bytes::Bytes::from_static(piece.as_bytes()))),
        );
        delta_stream(byte_stream)
    }

    #[test]
    fn builder_configures_retries() {
        let generator = OllamaGenerator::new("http://localhost:11434", "llama2")
            .with_max_retries(5)
            .with_retry_base_delay(Duration::from_millis(100));
        assert_eq!(generator.max_retries, 5);
        assert_eq!(generator.retry_base_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn decodes_ndjson_lines_into_deltas() {
        let stream = chunked(vec![
            "{\"response\":\"Hel\",\"done\":false}\n{\"response\":\"lo\",\"done\":false}\n",
            "{\"response\":\"!\",\"done\":true}\n",
        ]);
        assert_eq!(collect_text(stream).await, "Hello!");
    }

    #[tokio::test]
    async fn reassembles_lines_split_across_chunks() {
        let stream = chunked(vec![
            "{\"response\":\"par",
            "t one \",\"done\":false}\n",
            "{\"response\":\"part two\",\"done\":true}\n",
        ]);
        assert_eq!(collect_text(stream).await, "part one part two");
    }

    #[tokio::test]
    async fn skips_undecodable_lines() {
        let stream = chunked(vec![
            "not json at all\n{\"response\":\"ok\",\"done\":true}\n",
        ]);
        assert_eq!(collect_text(stream).await, "ok");
    }

    #[tokio::test]
    async fn stops_after_done_marker() {
        let stream = chunked(vec![
            "{\"response\":\"end\",\"done\":true}\n{\"response\":\"ignored\",\"done\":false}\n",
        ]);
        assert_eq!(collect_text(stream).await, "end");
    }

    #[tokio::test]
    async fn connection_failure_surfaces_as_error() {
        let generator = OllamaGenerator::new("http://127.0.0.1:1", "llama2")
            .with_max_retries(1)
            .with_retry_base_delay(Duration::from_millis(1));
        assert!(generator.generate("test").await.is_err());
    }
}
