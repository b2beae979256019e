//! Run registry
//!
//! Tracks runs for a hosting caller. The registry is an explicit value
//! with its own lock: the hosting service constructs one and passes it
//! around; there is no process-wide singleton. The single mutex guards
//! create, lookup and list; no run's state is ever shared with another.

use crate::state::{FinalState, RunStatus};
use citeline_domain::RunId;
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

/// Registry error
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No run with the given id
    #[error("Run not found: {0}")]
    RunNotFound(RunId),
}

/// One tracked run.
#[derive(Debug, Clone)]
pub struct RunEntry {
    /// Run identifier
    pub run_id: RunId,
    /// The prompt the run was created from
    pub prompt: String,
    /// Current status
    pub status: RunStatus,
    /// Final state, present once the run finished
    pub result: Option<FinalState>,
}

/// Registry of runs, keyed by id.
///
/// UUIDv7 keys keep `list` in creation order.
pub struct RunRegistry {
    runs: Mutex<BTreeMap<RunId, RunEntry>>,
}

impl RunRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { runs: Mutex::new(BTreeMap::new()) }
    }

    /// Register a new run and return its id.
    pub fn create(&self, prompt: impl Into<String>) -> RunId {
        let run_id = RunId::new();
        let entry = RunEntry {
            run_id,
            prompt: prompt.into(),
            status: RunStatus::Running,
            result: None,
        };
        self.runs.lock().unwrap().insert(run_id, entry);
        run_id
    }

    /// Look up a run by id.
    pub fn lookup(&self, run_id: RunId) -> Result<RunEntry, RegistryError> {
        self.runs
            .lock()
            .unwrap()
            .get(&run_id)
            .cloned()
            .ok_or(RegistryError::RunNotFound(run_id))
    }

    /// All runs in creation order.
    pub fn list(&self) -> Vec<RunEntry> {
        self.runs.lock().unwrap().values().cloned().collect()
    }

    /// Record a run's terminal state.
    pub fn finish(&self, run_id: RunId, result: FinalState) -> Result<(), RegistryError> {
        let mut runs = self.runs.lock().unwrap();
        let entry = runs.get_mut(&run_id).ok_or(RegistryError::RunNotFound(run_id))?;
        entry.status = result.status;
        entry.result = Some(result);
        Ok(())
    }

    /// Number of tracked runs.
    pub fn len(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.runs.lock().unwrap().is_empty()
    }
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}
