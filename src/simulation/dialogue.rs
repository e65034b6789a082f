use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::catalog::{CaseCatalog, DialogueNode, DialogueOption};
use crate::content::ids::{CharacterId, ClueId, NodeId, OptionId};

/// Where an interrogation currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Idle,
    SuspectSelected {
        character: CharacterId,
    },
    Asking {
        character: CharacterId,
        node: NodeId,
    },
    /// An option is picked but its response is still hidden.
    Chosen {
        character: CharacterId,
        node: NodeId,
        option: OptionId,
    },
    Answered {
        character: CharacterId,
        node: NodeId,
        option: OptionId,
    },
}

impl DialogueState {
    pub fn name(&self) -> &'static str {
        match self {
            DialogueState::Idle => "idle",
            DialogueState::SuspectSelected { .. } => "suspect_selected",
            DialogueState::Asking { .. } => "asking",
            DialogueState::Chosen { .. } => "chosen",
            DialogueState::Answered { .. } => "answered",
        }
    }

    pub fn character(&self) -> Option<&CharacterId> {
        match self {
            DialogueState::Idle => None,
            DialogueState::SuspectSelected { character }
            | DialogueState::Asking { character, .. }
            | DialogueState::Chosen { character, .. }
            | DialogueState::Answered { character, .. } => Some(character),
        }
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One answered question, in the order the player read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueStep {
    pub character_id: CharacterId,
    pub node_id: NodeId,
    pub option_id: OptionId,
}

/// What confirming an option asks the store to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEffects {
    pub character: CharacterId,
    pub node: NodeId,
    pub option: OptionId,
    pub response: String,
    pub reveal_clue: Option<ClueId>,
    pub suspicion_delta: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogueError {
    #[error("unknown character {0}")]
    UnknownCharacter(CharacterId),
    #[error("{0} is not a suspect")]
    NotASuspect(CharacterId),
    #[error("unknown dialogue {0}")]
    UnknownNode(NodeId),
    #[error("dialogue {node} does not belong to {character}")]
    ForeignNode { node: NodeId, character: CharacterId },
    #[error("option {option} is not part of dialogue {node}")]
    UnknownOption { node: NodeId, option: OptionId },
    #[error("no option has been chosen")]
    NoOptionChosen,
    #[error("dialogue {0} is closed until the suspect is selected again")]
    NodeClosed(NodeId),
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueSession {
    state: DialogueState,
    completed: Vec<DialogueStep>,
    closed: BTreeSet<NodeId>,
}

impl DialogueSession {
    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    /// Steps answered since the suspect was last selected.
    pub fn completed(&self) -> &[DialogueStep] {
        &self.completed
    }

    pub fn is_closed(&self, node: &NodeId) -> bool {
        self.closed.contains(node)
    }

    pub fn select_suspect(
        &mut self,
        catalog: &CaseCatalog,
        character: &CharacterId,
    ) -> Result<(), DialogueError> {
        let found = catalog
            .character(character)
            .ok_or_else(|| DialogueError::UnknownCharacter(character.clone()))?;
        if !found.is_suspect {
            return Err(DialogueError::NotASuspect(character.clone()));
        }
        self.state = DialogueState::SuspectSelected {
            character: character.clone(),
        };
        self.completed.clear();
        self.closed.clear();
        Ok(())
    }

    pub fn start_question(&mut self, catalog: &CaseCatalog, node: &NodeId) -> Result<(), DialogueError> {
        let DialogueState::SuspectSelected { character } = &self.state else {
            return Err(self.invalid("start a question"));
        };
        let found = catalog
            .node(node)
            .ok_or_else(|| DialogueError::UnknownNode(node.clone()))?;
        if &found.character_id != character {
            return Err(DialogueError::ForeignNode {
                node: node.clone(),
                character: character.clone(),
            });
        }
        if self.closed.contains(node) {
            return Err(DialogueError::NodeClosed(node.clone()));
        }
        self.state = DialogueState::Asking {
            character: character.clone(),
            node: node.clone(),
        };
        Ok(())
    }

    /// Picking again before confirming replaces the previous pick.
    pub fn choose_option(&mut self, catalog: &CaseCatalog, option: &OptionId) -> Result<(), DialogueError> {
        let (character, node) = match &self.state {
            DialogueState::Asking { character, node } | DialogueState::Chosen { character, node, .. } => {
                (character.clone(), node.clone())
            }
            _ => return Err(self.invalid("choose an option")),
        };
        lookup_option(catalog, &node, option)?;
        self.state = DialogueState::Chosen {
            character,
            node,
            option: option.clone(),
        };
        Ok(())
    }

    pub fn confirm(&mut self, catalog: &CaseCatalog) -> Result<OptionEffects, DialogueError> {
        let (character, node, option) = match &self.state {
            DialogueState::Chosen {
                character,
                node,
                option,
            } => (character.clone(), node.clone(), option.clone()),
            DialogueState::Answered { .. } => return Err(self.invalid("confirm")),
            _ => return Err(DialogueError::NoOptionChosen),
        };
        let (_, picked) = lookup_option(catalog, &node, &option)?;
        let effects = OptionEffects {
            character: character.clone(),
            node: node.clone(),
            option: option.clone(),
            response: picked.response.clone(),
            reveal_clue: picked.reveal_clue.clone(),
            suspicion_delta: picked.suspicion_delta,
        };
        self.state = DialogueState::Answered {
            character,
            node,
            option,
        };
        Ok(effects)
    }

    /// Moves past a read response and returns the step to record.
    pub fn advance(&mut self, catalog: &CaseCatalog) -> Result<DialogueStep, DialogueError> {
        let DialogueState::Answered {
            character,
            node,
            option,
        } = &self.state
        else {
            return Err(self.invalid("continue"));
        };
        let (_, picked) = lookup_option(catalog, node, option)?;
        let step = DialogueStep {
            character_id: character.clone(),
            node_id: node.clone(),
            option_id: option.clone(),
        };

        let next_state = match &picked.next_node {
            Some(next) => {
                self.closed.insert(node.clone());
                DialogueState::Asking {
                    character: character.clone(),
                    node: next.clone(),
                }
            }
            None => DialogueState::SuspectSelected {
                character: character.clone(),
            },
        };
        self.completed.push(step.clone());
        self.state = next_state;
        Ok(step)
    }

    pub fn leave(&mut self) {
        self.state = DialogueState::Idle;
    }

    /// Questions the selected suspect can still be asked.
    pub fn available_questions<'a>(&self, catalog: &'a CaseCatalog) -> Vec<&'a DialogueNode> {
        match self.state.character() {
            Some(character) => catalog
                .dialogues_for(character)
                .into_iter()
                .filter(|node| !self.closed.contains(&node.id))
                .collect(),
            None => Vec::new(),
        }
    }

    fn invalid(&self, action: &'static str) -> DialogueError {
        DialogueError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}

fn lookup_option<'a>(
    catalog: &'a CaseCatalog,
    node: &NodeId,
    option: &OptionId,
) -> Result<(&'a DialogueNode, &'a DialogueOption), DialogueError> {
    let found = catalog
        .node(node)
        .ok_or_else(|| DialogueError::UnknownNode(node.clone()))?;
    let picked = found.option(option).ok_or_else(|| DialogueError::UnknownOption {
        node: node.clone(),
        option: option.clone(),
    })?;
    Ok((found, picked))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marcus() -> CharacterId {
        CharacterId::from("char1")
    }

    fn answered(session: &mut DialogueSession, catalog: &CaseCatalog, node: &str, option: &str) -> OptionEffects {
        session.start_question(catalog, &NodeId::from(node)).unwrap();
        session.choose_option(catalog, &OptionId::from(option)).unwrap();
        session.confirm(catalog).unwrap()
    }

    #[test]
    fn only_suspects_can_be_interrogated() {
        let catalog = CaseCatalog::builtin().unwrap();
        let mut session = DialogueSession::default();
        assert_eq!(
            session.select_suspect(&catalog, &CharacterId::from("char4")),
            Err(DialogueError::NotASuspect(CharacterId::from("char4")))
        );
        assert!(matches!(
            session.select_suspect(&catalog, &CharacterId::from("nobody")),
            Err(DialogueError::UnknownCharacter(_))
        ));
        assert_eq!(session.state(), &DialogueState::Idle);
    }

    #[test]
    fn question_must_belong_to_selected_suspect() {
        let catalog = CaseCatalog::builtin().unwrap();
        let mut session = DialogueSession::default();
        assert!(matches!(
            session.start_question(&catalog, &NodeId::from("d1-1")),
            Err(DialogueError::InvalidTransition { .. })
        ));
        session.select_suspect(&catalog, &marcus()).unwrap();
        assert!(matches!(
            session.start_question(&catalog, &NodeId::from("d2-1")),
            Err(DialogueError::ForeignNode { .. })
        ));
    }

    #[test]
    fn confirm_requires_a_choice() {
        let catalog = CaseCatalog::builtin().unwrap();
        let mut session = DialogueSession::default();
        assert_eq!(session.confirm(&catalog), Err(DialogueError::NoOptionChosen));
        session.select_suspect(&catalog, &marcus()).unwrap();
        session.start_question(&catalog, &NodeId::from("d1-3")).unwrap();
        assert_eq!(session.confirm(&catalog), Err(DialogueError::NoOptionChosen));
        assert!(matches!(
            session.choose_option(&catalog, &OptionId::from("opt1")),
            Err(DialogueError::UnknownOption { .. })
        ));
    }

    #[test]
    fn rechoosing_replaces_the_pick() {
        let catalog = CaseCatalog::builtin().unwrap();
        let mut session = DialogueSession::default();
        session.select_suspect(&catalog, &marcus()).unwrap();
        session.start_question(&catalog, &NodeId::from("d1-3")).unwrap();
        session.choose_option(&catalog, &OptionId::from("opt7")).unwrap();
        session.choose_option(&catalog, &OptionId::from("opt8")).unwrap();
        let effects = session.confirm(&catalog).unwrap();
        assert_eq!(effects.option, OptionId::from("opt8"));
        assert_eq!(effects.reveal_clue, Some(ClueId::from("c12")));
        assert_eq!(effects.suspicion_delta, 3);
        assert!(matches!(
            session.confirm(&catalog),
            Err(DialogueError::InvalidTransition { action: "confirm", .. })
        ));
    }

    #[test]
    fn next_node_chains_and_closes_the_previous_question() {
        let catalog = CaseCatalog::builtin().unwrap();
        let mut session = DialogueSession::default();
        session.select_suspect(&catalog, &marcus()).unwrap();
        answered(&mut session, &catalog, "d1-1", "opt2");
        let step = session.advance(&catalog).unwrap();
        assert_eq!(step.node_id, NodeId::from("d1-1"));
        assert_eq!(
            session.state(),
            &DialogueState::Asking {
                character: marcus(),
                node: NodeId::from("d1-2"),
            }
        );
        assert!(session.is_closed(&NodeId::from("d1-1")));

        session.choose_option(&catalog, &OptionId::from("opt4")).unwrap();
        session.confirm(&catalog).unwrap();
        session.advance(&catalog).unwrap();
        assert_eq!(
            session.state(),
            &DialogueState::SuspectSelected { character: marcus() }
        );
        assert_eq!(
            session.start_question(&catalog, &NodeId::from("d1-1")),
            Err(DialogueError::NodeClosed(NodeId::from("d1-1")))
        );
        let open: Vec<&str> = session
            .available_questions(&catalog)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(open, vec!["d1-2", "d1-3"]);
        assert_eq!(session.completed().len(), 2);
    }

    #[test]
    fn reselecting_reopens_closed_questions() {
        let catalog = CaseCatalog::builtin().unwrap();
        let mut session = DialogueSession::default();
        session.select_suspect(&catalog, &marcus()).unwrap();
        answered(&mut session, &catalog, "d1-1", "opt1");
        session.advance(&catalog).unwrap();
        session.leave();
        assert_eq!(session.state(), &DialogueState::Idle);
        session.select_suspect(&catalog, &marcus()).unwrap();
        assert!(session.completed().is_empty());
        assert!(session.start_question(&catalog, &NodeId::from("d1-1")).is_ok());
    }

    #[test]
    fn leaving_discards_an_unconfirmed_choice() {
        let catalog = CaseCatalog::builtin().unwrap();
        let mut session = DialogueSession::default();
        session.select_suspect(&catalog, &marcus()).unwrap();
        session.start_question(&catalog, &NodeId::from("d1-3")).unwrap();
        session.choose_option(&catalog, &OptionId::from("opt9")).unwrap();
        session.leave();
        assert_eq!(session.confirm(&catalog), Err(DialogueError::NoOptionChosen));
        assert!(session.available_questions(&catalog).is_empty());
    }
}
