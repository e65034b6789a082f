use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(ClueId);
string_id!(CharacterId);
string_id!(LocationId);
string_id!(
    /// Dialogue node (one question put to a suspect).
    NodeId
);
string_id!(OptionId);
string_id!(NoteId);
string_id!(ConnectionId);

/// Save slots are addressed by a small integer.
pub type SlotId = u32;

/// What a board item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Clue,
    Character,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Clue => f.write_str("clue"),
            ItemKind::Character => f.write_str("character"),
        }
    }
}

/// One side of a deduction-board connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: String,
    pub kind: ItemKind,
}

impl BoardItem {
    pub fn clue(id: &ClueId) -> Self {
        Self {
            id: id.0.clone(),
            kind: ItemKind::Clue,
        }
    }

    pub fn character(id: &CharacterId) -> Self {
        Self {
            id: id.0.clone(),
            kind: ItemKind::Character,
        }
    }
}

impl fmt::Display for BoardItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
