pub mod dialogue;
pub mod investigation;
pub mod state;
pub mod time;

pub use dialogue::{DialogueError, DialogueSession, DialogueState, DialogueStep, OptionEffects};
pub use investigation::{ConfirmOutcome, Investigation, InvestigationBuilder, InvestigationError};
pub use state::{CaseState, Note};
pub use time::{Clock, ManualClock, SystemClock};
