use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_PAIRS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Agent,
    ToolObservation,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::ToolObservation => "tool_observation",
        }
    }
}

/// One entry of the conversation window. Fields are private so a turn cannot change after
/// it has been appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: TurnRole,
    content: String,
    timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), timestamp: Utc::now() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Agent, content)
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self::new(TurnRole::ToolObservation, content)
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Bounded FIFO window holding at most `2 * window_pairs` turns.
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    turns: VecDeque<ConversationTurn>,
    window_pairs: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_PAIRS)
    }
}

impl ConversationMemory {
    /// A window of zero pairs is treated as one pair.
    pub fn new(window_pairs: usize) -> Self {
        let window_pairs = window_pairs.max(1);
        Self { turns: VecDeque::with_capacity(window_pairs * 2), window_pairs }
    }

    pub fn capacity(&self) -> usize {
        self.window_pairs * 2
    }

    pub fn window_pairs(&self) -> usize {
        self.window_pairs
    }

    /// Eviction is positional and ignores roles, so with observations in the window the
    /// oldest remaining turn may be an agent turn. Config validation sizes the window so a
    /// run's own question stays in view.
    pub fn append(&mut self, turn: ConversationTurn) {
        if self.turns.len() + 1 > self.capacity() {
            // Evict the oldest pair before making room for the new turn.
            self.turns.pop_front();
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }
}
