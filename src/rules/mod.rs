pub mod analysis;
pub mod connection;

pub use analysis::{analyze, CaseAnalysis, Verdict};
pub use connection::{classify, matching_pair, Classification, Connection};
