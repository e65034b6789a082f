use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ids::{CharacterId, ClueId, LocationId, NodeId, OptionId};

pub const CASE_SCHEMA_VERSION: u32 = 1;

const BUILTIN_CASE: &str = include_str!("../../assets/cases/silent_echo.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueType {
    Visual,
    Document,
    Object,
    Testimony,
    Medical,
    Video,
    Financial,
}

/// A discoverable piece of evidence. Text fields hold string-table keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub id: ClueId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub clue_type: ClueType,
    pub location_id: LocationId,
    #[serde(default)]
    pub is_discovered: bool,
    /// Decoys never count towards the verdict.
    #[serde(default)]
    pub is_misleading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub role: String,
    pub description: String,
    pub portrait: String,
    pub is_suspect: bool,
    #[serde(default)]
    pub suspicion_level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub clues: Vec<ClueId>,
    #[serde(default)]
    pub characters: Vec<CharacterId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueOption {
    pub id: OptionId,
    pub text: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_clue: Option<ClueId>,
    #[serde(default)]
    pub suspicion_delta: u32,
    /// Question asked next once the response has been read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub id: NodeId,
    pub character_id: CharacterId,
    pub question: String,
    pub options: Vec<DialogueOption>,
}

impl DialogueNode {
    pub fn option(&self, option_id: &OptionId) -> Option<&DialogueOption> {
        self.options.iter().find(|option| &option.id == option_id)
    }
}

/// An authored, unordered pair of board item ids that proves part of the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub label: String,
    pub a: String,
    pub b: String,
}

impl KeyPair {
    pub fn matches(&self, first: &str, second: &str) -> bool {
        (self.a == first && self.b == second) || (self.a == second && self.b == first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    pub key_pairs: Vec<KeyPair>,
    pub solve_threshold: usize,
    pub culprit: CharacterId,
    pub solved_explanation: String,
    pub incomplete_explanation: String,
    pub not_started_explanation: String,
}

/// On-disk shape of a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub schema_version: u32,
    pub id: String,
    pub title: String,
    pub clues: Vec<Clue>,
    pub characters: Vec<Character>,
    pub locations: Vec<Location>,
    #[serde(default)]
    pub dialogues: Vec<DialogueNode>,
    pub answer_key: AnswerKey,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

/// The authored, read-only content of a single case.
#[derive(Debug, Clone)]
pub struct CaseCatalog {
    id: String,
    title: String,
    clues: BTreeMap<ClueId, Clue>,
    characters: BTreeMap<CharacterId, Character>,
    locations: BTreeMap<LocationId, Location>,
    nodes: BTreeMap<NodeId, DialogueNode>,
    node_order: BTreeMap<CharacterId, Vec<NodeId>>,
    answer_key: AnswerKey,
}

pub fn load_case_catalog(path: impl AsRef<Path>) -> Result<CaseCatalog, CatalogError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file: CaseFile = serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
        path: path.display().to_string(),
        source,
    })?;
    CaseCatalog::from_file(file)
}

impl CaseCatalog {
    /// The case shipped with the crate, "The Silent Echo".
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CASE)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CaseFile = serde_json::from_str(raw).map_err(|source| CatalogError::Json {
            path: "<inline>".to_string(),
            source,
        })?;
        Self::from_file(file)
    }

    pub fn from_file(file: CaseFile) -> Result<Self, CatalogError> {
        file.validate()?;

        let mut node_order: BTreeMap<CharacterId, Vec<NodeId>> = BTreeMap::new();
        for node in &file.dialogues {
            node_order
                .entry(node.character_id.clone())
                .or_default()
                .push(node.id.clone());
        }

        Ok(Self {
            id: file.id,
            title: file.title,
            clues: file.clues.into_iter().map(|c| (c.id.clone(), c)).collect(),
            characters: file
                .characters
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            locations: file
                .locations
                .into_iter()
                .map(|l| (l.id.clone(), l))
                .collect(),
            nodes: file
                .dialogues
                .into_iter()
                .map(|n| (n.id.clone(), n))
                .collect(),
            node_order,
            answer_key: file.answer_key,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn clues(&self) -> &BTreeMap<ClueId, Clue> {
        &self.clues
    }

    pub fn clue(&self, id: &ClueId) -> Option<&Clue> {
        self.clues.get(id)
    }

    pub fn characters(&self) -> &BTreeMap<CharacterId, Character> {
        &self.characters
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn locations(&self) -> &BTreeMap<LocationId, Location> {
        &self.locations
    }

    pub fn location(&self, id: &LocationId) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&DialogueNode> {
        self.nodes.get(id)
    }

    /// Questions for a character, in authored order.
    pub fn dialogues_for(&self, character: &CharacterId) -> Vec<&DialogueNode> {
        self.node_order
            .get(character)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn suspects(&self) -> impl Iterator<Item = &Character> {
        self.characters.values().filter(|c| c.is_suspect)
    }

    pub fn answer_key(&self) -> &AnswerKey {
        &self.answer_key
    }
}

impl CaseFile {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.schema_version != CASE_SCHEMA_VERSION {
            return Err(invalid(format!(
                "unsupported case schema version {} (expected {})",
                self.schema_version, CASE_SCHEMA_VERSION
            )));
        }
        if self.id.trim().is_empty() {
            return Err(invalid("case id cannot be empty".to_string()));
        }

        let clue_ids = unique_ids(self.clues.iter().map(|c| c.id.as_str()), "clue")?;
        let character_ids =
            unique_ids(self.characters.iter().map(|c| c.id.as_str()), "character")?;
        let location_ids = unique_ids(self.locations.iter().map(|l| l.id.as_str()), "location")?;
        if let Some(shared) = clue_ids.intersection(&character_ids).next() {
            return Err(invalid(format!(
                "id {} names both a clue and a character",
                shared
            )));
        }
        unique_ids(self.dialogues.iter().map(|n| n.id.as_str()), "dialogue node")?;

        for clue in &self.clues {
            if !location_ids.contains(clue.location_id.as_str()) {
                return Err(invalid(format!(
                    "clue {} references unknown location {}",
                    clue.id, clue.location_id
                )));
            }
        }

        for location in &self.locations {
            for clue_id in &location.clues {
                let clue = self.clues.iter().find(|c| &c.id == clue_id).ok_or_else(|| {
                    invalid(format!(
                        "location {} lists unknown clue {}",
                        location.id, clue_id
                    ))
                })?;
                if clue.location_id != location.id {
                    return Err(invalid(format!(
                        "location {} lists clue {} owned by {}",
                        location.id, clue_id, clue.location_id
                    )));
                }
            }
            for character_id in &location.characters {
                if !character_ids.contains(character_id.as_str()) {
                    return Err(invalid(format!(
                        "location {} lists unknown character {}",
                        location.id, character_id
                    )));
                }
            }
        }

        for node in &self.dialogues {
            self.validate_node(node, &clue_ids)?;
        }

        self.validate_answer_key()
    }

    fn validate_node(&self, node: &DialogueNode, clue_ids: &HashSet<&str>) -> Result<(), CatalogError> {
        let owner = self
            .characters
            .iter()
            .find(|c| c.id == node.character_id)
            .ok_or_else(|| {
                invalid(format!(
                    "dialogue {} belongs to unknown character {}",
                    node.id, node.character_id
                ))
            })?;
        if !owner.is_suspect {
            return Err(invalid(format!(
                "dialogue {} belongs to {} who is not a suspect",
                node.id, owner.id
            )));
        }
        if node.options.is_empty() {
            return Err(invalid(format!("dialogue {} has no options", node.id)));
        }

        unique_ids(
            node.options.iter().map(|o| o.id.as_str()),
            &format!("option in dialogue {}", node.id),
        )?;

        for option in &node.options {
            if let Some(clue) = &option.reveal_clue {
                if !clue_ids.contains(clue.as_str()) {
                    return Err(invalid(format!(
                        "option {} reveals unknown clue {}",
                        option.id, clue
                    )));
                }
            }
            if let Some(next) = &option.next_node {
                if next == &node.id {
                    return Err(invalid(format!(
                        "option {} links dialogue {} to itself",
                        option.id, node.id
                    )));
                }
                let target = self.dialogues.iter().find(|n| &n.id == next).ok_or_else(|| {
                    invalid(format!(
                        "option {} links to unknown dialogue {}",
                        option.id, next
                    ))
                })?;
                if target.character_id != node.character_id {
                    return Err(invalid(format!(
                        "option {} links dialogue {} to another character's dialogue {}",
                        option.id, node.id, next
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_answer_key(&self) -> Result<(), CatalogError> {
        let key = &self.answer_key;
        if key.key_pairs.is_empty() {
            return Err(invalid("answer key has no key pairs".to_string()));
        }
        unique_ids(key.key_pairs.iter().map(|p| p.label.as_str()), "key pair label")?;

        for pair in &key.key_pairs {
            for id in [&pair.a, &pair.b] {
                if let Some(clue) = self.clues.iter().find(|c| c.id.as_str() == id) {
                    if clue.is_misleading {
                        return Err(invalid(format!(
                            "key pair {} uses misleading clue {}",
                            pair.label, id
                        )));
                    }
                } else if let Some(character) = self.characters.iter().find(|c| c.id.as_str() == id) {
                    if !character.is_suspect {
                        return Err(invalid(format!(
                            "key pair {} uses {} who is not a suspect",
                            pair.label, id
                        )));
                    }
                } else {
                    return Err(invalid(format!(
                        "key pair {} references unknown item {}",
                        pair.label, id
                    )));
                }
            }
            if pair.a == pair.b {
                return Err(invalid(format!(
                    "key pair {} links {} to itself",
                    pair.label, pair.a
                )));
            }
        }

        if key.solve_threshold == 0 || key.solve_threshold > key.key_pairs.len() {
            return Err(invalid(format!(
                "solve threshold {} must be between 1 and {}",
                key.solve_threshold,
                key.key_pairs.len()
            )));
        }

        match self.characters.iter().find(|c| c.id == key.culprit) {
            Some(culprit) if culprit.is_suspect => Ok(()),
            Some(culprit) => Err(invalid(format!(
                "culprit {} is not a suspect",
                culprit.id
            ))),
            None => Err(invalid(format!("culprit {} is unknown", key.culprit))),
        }
    }
}

fn unique_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<HashSet<&'a str>, CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(invalid(format!("{} id cannot be empty", what)));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {} id {}", what, id)));
        }
    }
    Ok(seen)
}

fn invalid(message: String) -> CatalogError {
    CatalogError::Validation(message)
}
