//! Typed parsing of generator output
//!
//! Generators return prose, fenced JSON, or raw JSON. Parsing yields an
//! explicit variant instead of throwing: callers branch on
//! `Structured`/`Fallback` and every stage keeps a deterministic fallback
//! path for the latter.

use serde::de::DeserializeOwned;

/// Result of parsing collaborator output.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// The output decoded into the expected shape
    Structured(T),
    /// The output was not decodable; the raw text is preserved
    Fallback(String),
}

impl<T> Parsed<T> {
    /// The structured value, if parsing succeeded.
    pub fn structured(self) -> Option<T> {
        match self {
            Parsed::Structured(value) => Some(value),
            Parsed::Fallback(_) => None,
        }
    }
}

/// Parse generator output as JSON of the expected type.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Parsed<T> {
    let cleaned = strip_code_fence(text);
    match serde_json::from_str(&cleaned) {
        Ok(value) => Parsed::Structured(value),
        Err(_) => Parsed::Fallback(text.to_string()),
    }
}

/// Strip a markdown code fence if the output is wrapped in one.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return String::new();
        }
        lines[1..lines.len().saturating_sub(1)].join("\n")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_json_parses() {
        let parsed: Parsed<Vec<String>> = parse_json(r#"["a", "b"]"#);
        assert_eq!(parsed, Parsed::Structured(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn fenced_json_parses() {
        let text = "```json\n[\"one\"]\n```";
        let parsed: Parsed<Vec<String>> = parse_json(text);
        assert_eq!(parsed, Parsed::Structured(vec!["one".to_string()]));
    }

    #[test]
    fn fence_without_language_parses() {
        let text = "```\n{\"key\": 1}\n```";
        let parsed: Parsed<serde_json::Value> = parse_json(text);
        assert!(matches!(parsed, Parsed::Structured(_)));
    }

    #[test]
    fn prose_falls_back_with_raw_text() {
        let parsed: Parsed<Vec<String>> = parse_json("I could not produce JSON, sorry.");
        assert_eq!(parsed, Parsed::Fallback("I could not produce JSON, sorry.".to_string()));
    }

    #[test]
    fn wrong_shape_falls_back() {
        let parsed: Parsed<Vec<String>> = parse_json(r#"{"not": "an array"}"#);
        assert!(matches!(parsed, Parsed::Fallback(_)));
    }
}
