use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ids::SlotId;
use crate::core::serialization::SaveSnapshot;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("save payload error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSlot {
    pub slot: SlotId,
    /// Epoch milliseconds.
    pub saved_at: i64,
    pub snapshot: SaveSnapshot,
}

impl SaveSlot {
    pub fn discovered_clues(&self) -> usize {
        self.snapshot.discovered_clues()
    }
}

/// Storage for numbered save slots. Writing a slot replaces it entirely.
pub trait SaveRepository: Send + Sync {
    fn get(&self, slot: SlotId) -> Result<Option<SaveSlot>, SaveError>;
    fn put(&mut self, save: SaveSlot) -> Result<(), SaveError>;
    /// Returns whether a slot was removed.
    fn delete(&mut self, slot: SlotId) -> Result<bool, SaveError>;
    /// All occupied slots, ordered by slot number.
    fn list(&self) -> Result<Vec<SaveSlot>, SaveError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySaveRepository {
    slots: BTreeMap<SlotId, SaveSlot>,
}

impl SaveRepository for MemorySaveRepository {
    fn get(&self, slot: SlotId) -> Result<Option<SaveSlot>, SaveError> {
        Ok(self.slots.get(&slot).cloned())
    }

    fn put(&mut self, save: SaveSlot) -> Result<(), SaveError> {
        self.slots.insert(save.slot, save);
        Ok(())
    }

    fn delete(&mut self, slot: SlotId) -> Result<bool, SaveError> {
        Ok(self.slots.remove(&slot).is_some())
    }

    fn list(&self) -> Result<Vec<SaveSlot>, SaveError> {
        Ok(self.slots.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::catalog::CaseCatalog;
    use crate::content::locale::Language;
    use crate::simulation::state::CaseState;

    fn slot(slot: SlotId, saved_at: i64) -> SaveSlot {
        let catalog = CaseCatalog::builtin().unwrap();
        let state = CaseState::initial(&catalog, Language::Fr);
        SaveSlot {
            slot,
            saved_at,
            snapshot: SaveSnapshot::capture(&catalog, &state),
        }
    }

    #[test]
    fn put_overwrites_and_list_is_ordered() {
        let mut repo = MemorySaveRepository::default();
        repo.put(slot(3, 10)).unwrap();
        repo.put(slot(1, 20)).unwrap();
        repo.put(slot(3, 30)).unwrap();
        let listed: Vec<(SlotId, i64)> = repo
            .list()
            .unwrap()
            .iter()
            .map(|s| (s.slot, s.saved_at))
            .collect();
        assert_eq!(listed, vec![(1, 20), (3, 30)]);
    }

    #[test]
    fn deleting_an_empty_slot_is_not_an_error() {
        let mut repo = MemorySaveRepository::default();
        assert!(!repo.delete(2).unwrap());
        repo.put(slot(1, 10)).unwrap();
        repo.put(slot(3, 30)).unwrap();
        let before = repo.list().unwrap();
        assert!(!repo.delete(2).unwrap());
        assert_eq!(repo.list().unwrap(), before);

        repo.put(slot(2, 1)).unwrap();
        assert!(repo.delete(2).unwrap());
        assert!(repo.get(2).unwrap().is_none());
    }
}
