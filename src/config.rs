use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime configuration, resolved from the environment once at startup and
/// handed to the store and interface at construction. Nothing downstream
/// reads ambient process state, so tests can build isolated instances.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Lowercased Telegram usernames allowed to talk to the bot. Empty means
    /// nobody gets in, not everybody.
    pub allowed_users: HashSet<String>,
    /// Canonical room names, in configured order. Empty means any room text
    /// is accepted verbatim.
    pub rooms: Vec<String>,
    pub db_path: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is not set")?;

        let allowed_users = env::var("ALLOWED_USERNAMES")
            .unwrap_or_default()
            .split(',')
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty())
            .collect();

        let rooms = env::var("ROOMS")
            .unwrap_or_default()
            .split(',')
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        let db_path = env::var("TASKS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tasks.db"));

        Ok(Self {
            token,
            allowed_users,
            rooms,
            db_path,
        })
    }

    pub fn is_allowed(&self, username: &str) -> bool {
        self.allowed_users.contains(&username.to_lowercase())
    }

    /// Resolve user input to the canonical room spelling, case-insensitively.
    /// With no configured rooms, any non-empty text passes through verbatim.
    pub fn resolve_room(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if self.rooms.is_empty() {
            return Some(input.to_string());
        }
        let wanted = input.to_lowercase();
        self.rooms
            .iter()
            .find(|r| r.to_lowercase() == wanted)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rooms: &[&str], users: &[&str]) -> BotConfig {
        BotConfig {
            token: "test-token".to_string(),
            allowed_users: users.iter().map(|u| u.to_lowercase()).collect(),
            rooms: rooms.iter().map(|r| r.to_string()).collect(),
            db_path: PathBuf::from(":memory:"),
        }
    }

    #[test]
    fn allow_list_matches_case_insensitively() {
        let cfg = config(&[], &["Alice", "bob"]);
        assert!(cfg.is_allowed("alice"));
        assert!(cfg.is_allowed("ALICE"));
        assert!(cfg.is_allowed("Bob"));
        assert!(!cfg.is_allowed("mallory"));
    }

    #[test]
    fn empty_allow_list_denies_everyone() {
        let cfg = config(&["Kitchen"], &[]);
        assert!(!cfg.is_allowed("alice"));
        assert!(!cfg.is_allowed(""));
    }

    #[test]
    fn resolve_room_returns_canonical_spelling() {
        let cfg = config(&["Kitchen", "Living room"], &[]);
        assert_eq!(cfg.resolve_room("kitchen"), Some("Kitchen".to_string()));
        assert_eq!(cfg.resolve_room("LIVING ROOM"), Some("Living room".to_string()));
        assert_eq!(cfg.resolve_room("Garage"), None);
    }

    #[test]
    fn resolve_room_accepts_anything_without_an_allow_list() {
        let cfg = config(&[], &[]);
        assert_eq!(cfg.resolve_room("Attic"), Some("Attic".to_string()));
        assert_eq!(cfg.resolve_room("  Attic  "), Some("Attic".to_string()));
        assert_eq!(cfg.resolve_room("   "), None);
    }
}
