// Re-export core modules for use by the binary or other consumers
pub mod content;
pub mod core;
pub mod persistence;
pub mod rules;
pub mod simulation;

// Expose the investigation store and the types needed to drive it
pub use crate::content::{BoardItem, CaseCatalog, Language, StringTable, Translator};
pub use crate::core::serialization::SaveSnapshot;
pub use crate::rules::{CaseAnalysis, Verdict};
pub use crate::simulation::{Investigation, InvestigationError};
