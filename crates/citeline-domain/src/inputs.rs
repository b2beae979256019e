//! Run inputs

use serde::{Deserialize, Serialize};

/// Inputs a run starts from. The outline stage may replace topic, outline,
/// scope and exclusions with generated values; the raw prompt is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    /// The user's original request text
    #[serde(default)]
    pub raw_prompt: String,
    /// Report topic
    pub topic: String,
    /// Ordered chapter titles
    pub outline: Vec<String>,
    /// What the report covers
    pub scope: Option<String>,
    /// What the report explicitly leaves out
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl RunInputs {
    /// Inputs seeded from a bare prompt, before the outline stage runs.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self {
            topic: prompt.clone(),
            raw_prompt: prompt,
            outline: Vec::new(),
            scope: None,
            exclusions: Vec::new(),
        }
    }
}
