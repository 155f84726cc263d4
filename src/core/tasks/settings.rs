use rusqlite::params;

use super::TaskStore;
use crate::core::error::TaskError;

/// Key under which the delivery-target chat id is persisted across restarts.
const CHAT_ID_KEY: &str = "chat_id";

impl TaskStore {
    /// Upsert one configuration entry; at most one value per key.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), TaskError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO bot_config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub async fn get_config(&self, key: &str) -> Result<Option<String>, TaskError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare("SELECT value FROM bot_config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub async fn save_chat_id(&self, chat_id: i64) -> Result<(), TaskError> {
        self.set_config(CHAT_ID_KEY, &chat_id.to_string()).await
    }

    pub async fn chat_id(&self) -> Result<Option<i64>, TaskError> {
        Ok(self
            .get_config(CHAT_ID_KEY)
            .await?
            .and_then(|v| v.parse().ok()))
    }
}
