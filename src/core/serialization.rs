use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::content::catalog::CaseCatalog;
use crate::simulation::state::CaseState;

pub const SAVE_VERSION: u32 = 1;

/// Save payload: the full mutable state of one run, tagged with its case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    #[serde(default = "default_save_version")]
    pub version: u32,
    pub case_id: String,
    pub state: CaseState,
}

fn default_save_version() -> u32 {
    SAVE_VERSION
}

impl SaveSnapshot {
    pub fn capture(catalog: &CaseCatalog, state: &CaseState) -> Self {
        Self {
            version: SAVE_VERSION,
            case_id: catalog.id().to_string(),
            state: state.clone(),
        }
    }

    pub fn discovered_clues(&self) -> usize {
        self.state.discovered_count()
    }
}

/// Serialize a snapshot into pretty JSON.
pub fn snapshot_to_json(snapshot: &SaveSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

pub fn snapshot_from_json(data: &str) -> serde_json::Result<SaveSnapshot> {
    serde_json::from_str(data)
}

/// Write a snapshot to a file path.
pub fn save_snapshot_to_path<P: AsRef<Path>>(snapshot: &SaveSnapshot, path: P) -> std::io::Result<()> {
    let json = snapshot_to_json(snapshot).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

/// Read a snapshot from a file path.
pub fn load_snapshot_from_path<P: AsRef<Path>>(path: P) -> std::io::Result<SaveSnapshot> {
    let data = fs::read_to_string(&path)?;
    snapshot_from_json(&data).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}
