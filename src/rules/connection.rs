use serde::{Deserialize, Serialize};

use crate::content::catalog::{AnswerKey, KeyPair};
use crate::content::ids::{BoardItem, ConnectionId};

pub const KEY_REASON: &str = "connection.key";
pub const CIRCUMSTANTIAL_REASON: &str = "connection.circumstantial";

/// A link the player drew on the deduction board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub left: BoardItem,
    pub right: BoardItem,
    pub reason: String,
    pub is_key: bool,
}

impl Connection {
    /// True when this connection joins the ids of `a` and `b`, in either order.
    pub fn links(&self, a: &BoardItem, b: &BoardItem) -> bool {
        let (left, right) = (self.left.id.as_str(), self.right.id.as_str());
        (left == a.id && right == b.id) || (left == b.id && right == a.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_key: bool,
    pub key_pair: Option<String>,
    pub reason: &'static str,
}

pub fn matching_pair<'a>(key: &'a AnswerKey, left: &str, right: &str) -> Option<&'a KeyPair> {
    key.key_pairs.iter().find(|pair| pair.matches(left, right))
}

/// Only ids take part in the match; item kinds and click order are ignored.
pub fn classify(key: &AnswerKey, left: &BoardItem, right: &BoardItem) -> Classification {
    match matching_pair(key, &left.id, &right.id) {
        Some(pair) => Classification {
            is_key: true,
            key_pair: Some(pair.label.clone()),
            reason: KEY_REASON,
        },
        None => Classification {
            is_key: false,
            key_pair: None,
            reason: CIRCUMSTANTIAL_REASON,
        },
    }
}
