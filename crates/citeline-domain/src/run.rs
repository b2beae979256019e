//! Run identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a pipeline run, based on UUIDv7
///
/// UUIDv7 keeps run ids chronologically sortable, which makes registry
/// listings read in creation order without extra bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Generate a new UUIDv7-based RunId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Parse a RunId from its string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid run id: {}", e))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
