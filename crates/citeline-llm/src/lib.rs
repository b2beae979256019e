//! Citeline Text Generation Layer
//!
//! Implementations of the `TextGenerator` trait from `citeline-domain`.
//! The pipeline works without any generator at all (every stage has a
//! deterministic fallback); these backends exist for runs that want real
//! prose.
//!
//! # Generators
//!
//! - `MockGenerator`: deterministic, scripted responses for tests
//! - `OllamaGenerator`: streaming local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use citeline_llm::{collect_text, MockGenerator};
//! use citeline_domain::traits::TextGenerator;
//!
//! # tokio_test::block_on(async {
//! let generator = MockGenerator::new("Hello from the generator");
//! let stream = generator.generate("test prompt").await.unwrap();
//! assert_eq!(collect_text(stream).await, "Hello from the generator");
//! # });
//! ```

#![warn(missing_docs)]

pub mod ollama;

use async_trait::async_trait;
use citeline_domain::traits::{DeltaStream, GenerationError, TextGenerator};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::OllamaGenerator;

/// Errors that can occur while talking to a generation backend.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the backend
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available on the backend
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),
}

impl From<LlmError> for GenerationError {
    fn from(error: LlmError) -> Self {
        GenerationError(error.to_string())
    }
}

/// Drain a delta stream into the full response text.
pub async fn collect_text(mut stream: DeltaStream) -> String {
    let mut text = String::new();
    while let Some(delta) = stream.next().await {
        text.push_str(&delta);
    }
    text
}

/// Scripted generator for deterministic testing.
///
/// Responses are selected by substring match against the prompt; prompts
/// matching no script get the default response. The response text is
/// emitted as a sequence of word deltas so consumers exercise the same
/// streaming path as a live backend.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, Option<String>)>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockGenerator {
    /// Create a generator with a fixed response for all prompts.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Script a response for prompts containing `needle`.
    pub fn add_response(&mut self, needle: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push((needle.into(), Some(response.into())));
    }

    /// Script a failure for prompts containing `needle`.
    pub fn add_error(&mut self, needle: impl Into<String>) {
        self.responses.lock().unwrap().push((needle.into(), None));
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn word_deltas(text: &str) -> DeltaStream {
        let deltas: Vec<String> = text.split_inclusive(' ').map(str::to_string).collect();
        futures::stream::iter(deltas).boxed()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<DeltaStream, GenerationError> {
        *self.call_count.lock().unwrap() += 1;
        let responses = self.responses.lock().unwrap();
        for (needle, response) in responses.iter() {
            if prompt.contains(needle) {
                return match response {
                    Some(text) => Ok(Self::word_deltas(text)),
                    None => Err(GenerationError("scripted failure".to_string())),
                };
            }
        }
        Ok(Self::word_deltas(&self.default_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_response_streams_back() {
        let generator = MockGenerator::new("one two three");
        let stream = generator.generate("anything").await.unwrap();
        assert_eq!(collect_text(stream).await, "one two three");
    }

    #[tokio::test]
    async fn scripted_responses_match_by_substring() {
        let mut generator = MockGenerator::default();
        generator.add_response("outline", "[\"C1\"]");
        generator.add_response("queries", "[\"q1\"]");
        let outline = generator.generate("produce an outline now").await.unwrap();
        assert_eq!(collect_text(outline).await, "[\"C1\"]");
        let queries = generator.generate("list search queries").await.unwrap();
        assert_eq!(collect_text(queries).await, "[\"q1\"]");
        let fallback = generator.generate("unrelated").await.unwrap();
        assert_eq!(collect_text(fallback).await, "Default mock response");
    }

    #[tokio::test]
    async fn scripted_errors_surface() {
        let mut generator = MockGenerator::default();
        generator.add_error("bad prompt");
        assert!(generator.generate("a bad prompt indeed").await.is_err());
    }

    #[tokio::test]
    async fn call_count_tracks_usage() {
        let generator = MockGenerator::new("x");
        assert_eq!(generator.call_count(), 0);
        let _ = generator.generate("one").await.unwrap();
        let _ = generator.generate("two").await.unwrap();
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn deltas_arrive_as_multiple_chunks() {
        let generator = MockGenerator::new("alpha beta gamma");
        let stream = generator.generate("p").await.unwrap();
        let deltas: Vec<String> = stream.collect().await;
        assert!(deltas.len() > 1);
        assert_eq!(deltas.concat(), "alpha beta gamma");
    }
}
