use std::sync::Arc;

use bevy_ecs::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::catalog::{CaseCatalog, Character, Clue, DialogueNode, Location};
use crate::content::ids::{
    BoardItem, CharacterId, ClueId, ConnectionId, ItemKind, LocationId, NodeId, NoteId, OptionId,
    SlotId,
};
use crate::content::locale::Language;
use crate::core::allocator::{IdProvider, SequentialIds};
use crate::core::serialization::{SaveSnapshot, SAVE_VERSION};
use crate::persistence::repository::{MemorySaveRepository, SaveError, SaveRepository, SaveSlot};
use crate::rules::analysis::{analyze, CaseAnalysis};
use crate::rules::connection::{classify, Connection};
use crate::simulation::dialogue::{DialogueError, DialogueSession, DialogueState, DialogueStep};
use crate::simulation::state::{CaseState, Note};
use crate::simulation::time::{Clock, SystemClock};

#[derive(Debug, Error)]
pub enum InvestigationError {
    #[error("unknown clue {0}")]
    UnknownClue(ClueId),
    #[error("unknown character {0}")]
    UnknownCharacter(CharacterId),
    #[error("unknown location {0}")]
    UnknownLocation(LocationId),
    #[error("unknown note {0}")]
    UnknownNote(NoteId),
    #[error("{0} is not a suspect and cannot go on the board")]
    NotASuspect(CharacterId),
    #[error("clue {0} has not been discovered yet")]
    UndiscoveredClue(ClueId),
    #[error("cannot connect {0} to itself")]
    SelfConnection(String),
    #[error("{id} is not a {expected}")]
    KindMismatch { id: String, expected: ItemKind },
    #[error("save slot {0} is empty")]
    EmptySaveSlot(SlotId),
    #[error("save slot {slot} holds case {case_id} (version {version}) which cannot be loaded here")]
    IncompatibleSave {
        slot: SlotId,
        case_id: String,
        version: u32,
    },
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

fn reject(err: InvestigationError) -> InvestigationError {
    warn!(error = %err, "investigation operation rejected");
    err
}

/// What the player sees after confirming a dialogue option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOutcome {
    pub response: String,
    /// Set only when this confirmation discovered the clue.
    pub revealed_clue: Option<ClueId>,
    /// Zero when this option's effects were already applied earlier in the run.
    pub suspicion_raised: u32,
}

/// Live state of one investigation run. Every mutation goes through here.
#[derive(Resource)]
pub struct Investigation {
    catalog: Arc<CaseCatalog>,
    state: CaseState,
    analysis: Option<CaseAnalysis>,
    dialogue: DialogueSession,
    saves: Box<dyn SaveRepository>,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdProvider>,
}

pub struct InvestigationBuilder {
    catalog: Arc<CaseCatalog>,
    language: Language,
    saves: Option<Box<dyn SaveRepository>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Box<dyn IdProvider>>,
}

impl InvestigationBuilder {
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn saves(mut self, saves: impl SaveRepository + 'static) -> Self {
        self.saves = Some(Box::new(saves));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ids(mut self, ids: impl IdProvider + 'static) -> Self {
        self.ids = Some(Box::new(ids));
        self
    }

    pub fn build(self) -> Investigation {
        let state = CaseState::initial(&self.catalog, self.language);
        Investigation {
            catalog: self.catalog,
            state,
            analysis: None,
            dialogue: DialogueSession::default(),
            saves: self
                .saves
                .unwrap_or_else(|| Box::new(MemorySaveRepository::default())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            ids: self.ids.unwrap_or_else(|| Box::new(SequentialIds::default())),
        }
    }
}

impl Investigation {
    pub fn new(catalog: Arc<CaseCatalog>) -> Self {
        Self::builder(catalog).build()
    }

    pub fn builder(catalog: Arc<CaseCatalog>) -> InvestigationBuilder {
        InvestigationBuilder {
            catalog,
            language: Language::default(),
            saves: None,
            clock: None,
            ids: None,
        }
    }

    // Read API

    pub fn catalog(&self) -> &CaseCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &CaseState {
        &self.state
    }

    pub fn current_location(&self) -> Option<&Location> {
        self.state
            .current_location
            .as_ref()
            .and_then(|id| self.state.locations.get(id))
    }

    pub fn clues(&self) -> impl Iterator<Item = &Clue> {
        self.state.clues.values()
    }

    pub fn clue(&self, id: &ClueId) -> Option<&Clue> {
        self.state.clues.get(id)
    }

    pub fn discovered_clues(&self) -> impl Iterator<Item = &Clue> {
        self.state.clues.values().filter(|clue| clue.is_discovered)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.state.characters.values()
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.state.characters.get(id)
    }

    pub fn suspects(&self) -> impl Iterator<Item = &Character> {
        self.state.characters.values().filter(|c| c.is_suspect)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.state.locations.values()
    }

    /// Discovered and total clue counts for a location.
    pub fn location_progress(&self, id: &LocationId) -> Option<(usize, usize)> {
        let location = self.state.locations.get(id)?;
        let found = location
            .clues
            .iter()
            .filter(|clue| self.state.clues.get(*clue).is_some_and(|c| c.is_discovered))
            .count();
        Some((found, location.clues.len()))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.state.connections
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.state.notes.values()
    }

    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.state.notes.get(id)
    }

    pub fn language(&self) -> Language {
        self.state.language
    }

    pub fn analysis(&self) -> Option<&CaseAnalysis> {
        self.analysis.as_ref()
    }

    pub fn dialogue_history(&self) -> &[DialogueStep] {
        &self.state.dialogue_history
    }

    pub fn dialogue_state(&self) -> &DialogueState {
        self.dialogue.state()
    }

    pub fn available_questions(&self) -> Vec<&DialogueNode> {
        self.dialogue.available_questions(&self.catalog)
    }

    pub fn save_slots(&self) -> Result<Vec<SaveSlot>, InvestigationError> {
        Ok(self.saves.list()?)
    }

    // Exploration

    pub fn set_current_location(&mut self, id: Option<&LocationId>) -> Result<(), InvestigationError> {
        if let Some(id) = id {
            if !self.state.locations.contains_key(id) {
                return Err(reject(InvestigationError::UnknownLocation(id.clone())));
            }
        }
        self.state.current_location = id.cloned();
        debug!(location = ?self.state.current_location, "location changed");
        Ok(())
    }

    /// Returns whether the clue was newly discovered.
    pub fn discover_clue(&mut self, id: &ClueId) -> Result<bool, InvestigationError> {
        let clue = self
            .state
            .clues
            .get_mut(id)
            .ok_or_else(|| reject(InvestigationError::UnknownClue(id.clone())))?;
        if clue.is_discovered {
            return Ok(false);
        }
        clue.is_discovered = true;
        debug!(clue = %id, "clue discovered");
        Ok(true)
    }

    // Deduction board

    /// Returns whether the pair is one of the case's key pairs. Proposing a pair that
    /// is already on the board returns its classification without adding a duplicate.
    pub fn add_connection(&mut self, left: BoardItem, right: BoardItem) -> Result<bool, InvestigationError> {
        if left.id == right.id {
            return Err(reject(InvestigationError::SelfConnection(left.to_string())));
        }
        self.check_item(&left)?;
        self.check_item(&right)?;

        if let Some(existing) = self.state.connections.iter().find(|c| c.links(&left, &right)) {
            debug!(connection = %existing.id, "connection already on the board");
            return Ok(existing.is_key);
        }

        let class = classify(self.catalog.answer_key(), &left, &right);
        let connection = Connection {
            id: ConnectionId::new(self.ids.next_id("connection")),
            left,
            right,
            reason: class.reason.to_string(),
            is_key: class.is_key,
        };
        debug!(
            connection = %connection.id,
            left = %connection.left,
            right = %connection.right,
            is_key = connection.is_key,
            "connection added"
        );
        self.state.connections.push(connection);
        self.analysis = None;
        Ok(class.is_key)
    }

    pub fn clear_connections(&mut self) {
        self.state.connections.clear();
        self.analysis = None;
        debug!("connections cleared");
    }

    pub fn analyze_case(&mut self) -> CaseAnalysis {
        let analysis = analyze(self.catalog.answer_key(), &self.state.connections);
        info!(
            verdict = ?analysis.verdict,
            key_connections = analysis.key_connections,
            total_connections = analysis.total_connections,
            "case analyzed"
        );
        self.analysis = Some(analysis.clone());
        analysis
    }

    /// Only discovered clues and suspects may go on the board.
    fn check_item(&self, item: &BoardItem) -> Result<(), InvestigationError> {
        let id = item.id.as_str();
        let other = match item.kind {
            ItemKind::Clue => match self.state.clues.get(id) {
                Some(clue) if clue.is_discovered => return Ok(()),
                Some(clue) => {
                    return Err(reject(InvestigationError::UndiscoveredClue(clue.id.clone())))
                }
                None => self.state.characters.contains_key(id),
            },
            ItemKind::Character => match self.state.characters.get(id) {
                Some(character) if character.is_suspect => return Ok(()),
                Some(character) => {
                    return Err(reject(InvestigationError::NotASuspect(character.id.clone())))
                }
                None => self.state.clues.contains_key(id),
            },
        };
        let err = match (other, item.kind) {
            (true, expected) => InvestigationError::KindMismatch {
                id: item.id.clone(),
                expected,
            },
            (false, ItemKind::Clue) => InvestigationError::UnknownClue(ClueId::new(item.id.clone())),
            (false, ItemKind::Character) => {
                InvestigationError::UnknownCharacter(CharacterId::new(item.id.clone()))
            }
        };
        Err(reject(err))
    }

    // Notebook

    pub fn add_note(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        clue_id: Option<ClueId>,
    ) -> Result<NoteId, InvestigationError> {
        if let Some(clue) = &clue_id {
            if !self.state.clues.contains_key(clue) {
                return Err(reject(InvestigationError::UnknownClue(clue.clone())));
            }
        }
        let now = self.clock.now_millis();
        let id = NoteId::new(self.ids.next_id("note"));
        let note = Note {
            id: id.clone(),
            clue_id,
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        };
        self.state.notes.insert(id.clone(), note);
        debug!(note = %id, "note added");
        Ok(id)
    }

    pub fn update_note(
        &mut self,
        id: &NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), InvestigationError> {
        let now = self.clock.now_millis();
        let note = self
            .state
            .notes
            .get_mut(id)
            .ok_or_else(|| reject(InvestigationError::UnknownNote(id.clone())))?;
        note.edit(title.into(), content.into(), now);
        debug!(note = %id, updated_at = note.updated_at, "note updated");
        Ok(())
    }

    pub fn delete_note(&mut self, id: &NoteId) -> Result<(), InvestigationError> {
        if self.state.notes.remove(id).is_none() {
            return Err(reject(InvestigationError::UnknownNote(id.clone())));
        }
        debug!(note = %id, "note deleted");
        Ok(())
    }

    pub fn set_language(&mut self, language: Language) {
        self.state.language = language;
        debug!(%language, "language changed");
    }

    // Interrogation

    pub fn select_suspect(&mut self, character: &CharacterId) -> Result<(), InvestigationError> {
        self.dialogue
            .select_suspect(&self.catalog, character)
            .map_err(|e| reject(e.into()))?;
        debug!(character = %character, "suspect selected");
        Ok(())
    }

    pub fn start_question(&mut self, node: &NodeId) -> Result<(), InvestigationError> {
        self.dialogue
            .start_question(&self.catalog, node)
            .map_err(|e| reject(e.into()))
    }

    pub fn choose_option(&mut self, option: &OptionId) -> Result<(), InvestigationError> {
        self.dialogue
            .choose_option(&self.catalog, option)
            .map_err(|e| reject(e.into()))
    }

    /// Shows the chosen option's response and applies its effects once per run.
    pub fn confirm_choice(&mut self) -> Result<ConfirmOutcome, InvestigationError> {
        let mut session = self.dialogue.clone();
        let effects = session
            .confirm(&self.catalog)
            .map_err(|e| reject(e.into()))?;
        if let Some(clue) = &effects.reveal_clue {
            if !self.state.clues.contains_key(clue) {
                return Err(reject(InvestigationError::UnknownClue(clue.clone())));
            }
        }
        if !self.state.characters.contains_key(&effects.character) {
            return Err(reject(InvestigationError::UnknownCharacter(
                effects.character.clone(),
            )));
        }
        self.dialogue = session;

        let first_time = self
            .state
            .applied_options
            .insert((effects.node.clone(), effects.option.clone()));
        let mut outcome = ConfirmOutcome {
            response: effects.response,
            revealed_clue: None,
            suspicion_raised: 0,
        };
        if !first_time {
            debug!(node = %effects.node, option = %effects.option, "option effects already applied");
            return Ok(outcome);
        }

        if let Some(clue) = effects.reveal_clue {
            if self.discover_clue(&clue)? {
                outcome.revealed_clue = Some(clue);
            }
        }
        if let Some(character) = self.state.characters.get_mut(&effects.character) {
            character.suspicion_level = character.suspicion_level.saturating_add(effects.suspicion_delta);
            outcome.suspicion_raised = effects.suspicion_delta;
            debug!(
                character = %character.id,
                suspicion = character.suspicion_level,
                "suspicion raised"
            );
        }
        Ok(outcome)
    }

    pub fn continue_dialogue(&mut self) -> Result<DialogueStep, InvestigationError> {
        let step = self
            .dialogue
            .advance(&self.catalog)
            .map_err(|e| reject(e.into()))?;
        self.state.dialogue_history.push(step.clone());
        Ok(step)
    }

    pub fn leave_interrogation(&mut self) {
        self.dialogue.leave();
    }

    // Saves

    pub fn save_game(&mut self, slot: SlotId) -> Result<(), InvestigationError> {
        let save = SaveSlot {
            slot,
            saved_at: self.clock.now_millis(),
            snapshot: SaveSnapshot::capture(&self.catalog, &self.state),
        };
        self.saves.put(save).map_err(|e| reject(e.into()))?;
        info!(slot, "game saved");
        Ok(())
    }

    pub fn load_game(&mut self, slot: SlotId) -> Result<(), InvestigationError> {
        let save = self
            .saves
            .get(slot)
            .map_err(|e| reject(e.into()))?
            .ok_or_else(|| reject(InvestigationError::EmptySaveSlot(slot)))?;
        let snapshot = save.snapshot;
        if snapshot.case_id != self.catalog.id() || snapshot.version > SAVE_VERSION {
            return Err(reject(InvestigationError::IncompatibleSave {
                slot,
                case_id: snapshot.case_id,
                version: snapshot.version,
            }));
        }

        self.state = snapshot.state;
        self.analysis = None;
        self.dialogue = DialogueSession::default();
        for id in self.state.issued_ids() {
            self.ids.observe(id);
        }
        info!(slot, saved_at = save.saved_at, "game loaded");
        Ok(())
    }

    /// Returns whether a save was removed. An empty slot is not an error.
    pub fn delete_save(&mut self, slot: SlotId) -> Result<bool, InvestigationError> {
        let removed = self.saves.delete(slot).map_err(|e| reject(e.into()))?;
        info!(slot, removed, "save deleted");
        Ok(removed)
    }

    /// Back to the authored starting point. Saves and language survive.
    pub fn reset_game(&mut self) {
        self.state = CaseState::initial(&self.catalog, self.state.language);
        self.analysis = None;
        self.dialogue = DialogueSession::default();
        info!(case = self.catalog.id(), "game reset");
    }
}
