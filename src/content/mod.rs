pub mod catalog;
pub mod ids;
pub mod locale;

pub use catalog::{
    load_case_catalog, AnswerKey, CaseCatalog, CaseFile, CatalogError, Character, Clue, ClueType,
    DialogueNode, DialogueOption, KeyPair, Location, CASE_SCHEMA_VERSION,
};
pub use ids::{
    BoardItem, CharacterId, ClueId, ConnectionId, ItemKind, LocationId, NodeId, NoteId, OptionId,
    SlotId,
};
pub use locale::{Language, Message, StringTable, Translator};
