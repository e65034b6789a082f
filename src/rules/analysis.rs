use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::content::catalog::AnswerKey;
use crate::content::ids::CharacterId;
use crate::content::locale::Message;
use crate::rules::connection::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Solved,
    Incomplete,
    NotStarted,
}

impl Verdict {
    pub fn label_key(self) -> &'static str {
        match self {
            Verdict::Solved => "conclusion.solved",
            Verdict::Incomplete => "conclusion.incomplete",
            Verdict::NotStarted => "conclusion.not_started",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAnalysis {
    pub solved: bool,
    pub accused: Option<CharacterId>,
    pub key_connections: usize,
    pub total_connections: usize,
    pub verdict: Verdict,
    pub explanation: Message,
    /// Labels of the key pairs found, in answer-key order.
    pub matched_pairs: Vec<String>,
}

pub fn analyze(key: &AnswerKey, connections: &[Connection]) -> CaseAnalysis {
    let matched: BTreeSet<usize> = connections
        .iter()
        .filter_map(|connection| {
            key.key_pairs
                .iter()
                .position(|pair| pair.matches(&connection.left.id, &connection.right.id))
        })
        .collect();

    let key_connections = matched.len();
    let total_connections = connections.len();
    let matched_pairs = matched
        .iter()
        .map(|&index| key.key_pairs[index].label.clone())
        .collect();

    let (verdict, explanation) = if key_connections >= key.solve_threshold {
        (Verdict::Solved, Message::new(&key.solved_explanation))
    } else if total_connections > 0 {
        (
            Verdict::Incomplete,
            Message::new(&key.incomplete_explanation).with_arg("count", total_connections),
        )
    } else {
        (Verdict::NotStarted, Message::new(&key.not_started_explanation))
    };

    let solved = verdict == Verdict::Solved;
    CaseAnalysis {
        solved,
        accused: solved.then(|| key.culprit.clone()),
        key_connections,
        total_connections,
        verdict,
        explanation,
        matched_pairs,
    }
}
