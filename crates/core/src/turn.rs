//! Turn — one message in a conversation.
//!
//! A conversation is an ordered `Vec<Turn>`. Turns are immutable once
//! appended: the orchestration loop only ever appends (the model's response
//! as an assistant turn, tool results as a synthetic user turn), never
//! mutates history.

use serde::{Deserialize, Serialize};

/// Who a turn is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (also used for synthetic tool-result turns)
    User,
    /// The model
    Assistant,
    /// System instructions
    System,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Find the most recent user turn's content, if any.
pub fn last_user_content(turns: &[Turn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .find(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
}
