use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::content::catalog::{CaseCatalog, Character, Clue, Location};
use crate::content::ids::{CharacterId, ClueId, LocationId, NodeId, NoteId, OptionId};
use crate::content::locale::Language;
use crate::rules::connection::Connection;
use crate::simulation::dialogue::DialogueStep;

/// A free-form entry in the player's notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clue_id: Option<ClueId>,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    pub fn edit(&mut self, title: String, content: String, now: i64) {
        self.title = title;
        self.content = content;
        self.updated_at = now.max(self.updated_at.saturating_add(1));
    }
}

/// Everything that changes during a run. Saved and restored as one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseState {
    pub current_location: Option<LocationId>,
    pub clues: BTreeMap<ClueId, Clue>,
    pub characters: BTreeMap<CharacterId, Character>,
    pub locations: BTreeMap<LocationId, Location>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub notes: BTreeMap<NoteId, Note>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub dialogue_history: Vec<DialogueStep>,
    #[serde(default)]
    pub applied_options: BTreeSet<(NodeId, OptionId)>,
}

impl CaseState {
    pub fn initial(catalog: &CaseCatalog, language: Language) -> Self {
        Self {
            current_location: None,
            clues: catalog.clues().clone(),
            characters: catalog.characters().clone(),
            locations: catalog.locations().clone(),
            connections: Vec::new(),
            notes: BTreeMap::new(),
            language,
            dialogue_history: Vec::new(),
            applied_options: BTreeSet::new(),
        }
    }

    pub fn discovered_count(&self) -> usize {
        self.clues.values().filter(|c| c.is_discovered).count()
    }

    /// Ids a restored state may hold that an id provider must not hand out again.
    pub fn issued_ids(&self) -> impl Iterator<Item = &str> {
        self.connections
            .iter()
            .map(|c| c.id.as_str())
            .chain(self.notes.keys().map(|id| id.as_str()))
    }
}
