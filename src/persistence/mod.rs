pub mod repository;
pub mod sqlite;

pub use repository::{MemorySaveRepository, SaveError, SaveRepository, SaveSlot};
pub use sqlite::SqliteSaveRepository;
