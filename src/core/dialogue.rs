//! Multi-step conversation state, keyed per (chat, user).
//!
//! Each flow only moves forward; `/cancel` (or a terminal reply) drops the
//! entry entirely, so there is no way to re-enter an earlier step with stale
//! data left behind.

use std::collections::HashMap;

/// Task field a user may change through the edit flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    Frequency,
    Room,
    Notes,
    Points,
}

impl EditField {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "name" => Some(Self::Name),
            "frequency" => Some(Self::Frequency),
            "room" => Some(Self::Room),
            "notes" => Some(Self::Notes),
            "points" => Some(Self::Points),
            _ => None,
        }
    }

    /// Column name the store expects for this field.
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Frequency => "frequency_days",
            Self::Room => "room",
            Self::Notes => "notes",
            Self::Points => "points",
        }
    }

    /// The wording used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Frequency => "frequency",
            Self::Room => "room",
            Self::Notes => "notes",
            Self::Points => "points",
        }
    }

    pub const CHOICES: &'static str = "'name', 'frequency', 'room', 'notes' or 'points'";
}

/// Where a multi-step conversation currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialogue {
    AddAwaitingName,
    AddAwaitingRoom { name: String },
    AddAwaitingFrequency { name: String, room: String },
    DoneAwaitingId,
    EditAwaitingId,
    EditAwaitingField { id: i64 },
    EditAwaitingValue { id: i64, field: EditField },
}

/// Active dialogue per (chat id, user id). Replaces ambient per-user scratch
/// state so parallel sessions cannot bleed into each other.
#[derive(Debug, Default)]
pub struct DialogueMap {
    sessions: HashMap<(i64, u64), Dialogue>,
}

impl DialogueMap {
    pub fn set(&mut self, chat: i64, user: u64, state: Dialogue) {
        self.sessions.insert((chat, user), state);
    }

    /// Remove and return the session's state; the caller re-inserts the next
    /// state only when the flow continues.
    pub fn take(&mut self, chat: i64, user: u64) -> Option<Dialogue> {
        self.sessions.remove(&(chat, user))
    }

    /// Drop any in-flight flow. Returns whether one existed.
    pub fn cancel(&mut self, chat: i64, user: u64) -> bool {
        self.sessions.remove(&(chat, user)).is_some()
    }
}
