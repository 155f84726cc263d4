use chrono::{NaiveDateTime, Utc};
use rusqlite::params;

use super::TaskStore;
use super::types::{UserPoints, to_iso};
use crate::core::error::TaskError;

impl TaskStore {
    /// Append one completion event. The task name and point value are
    /// snapshotted so later edits to the task do not rewrite history.
    pub async fn record_completion(
        &self,
        username: &str,
        task_id: i64,
        task_name: &str,
        points: u32,
    ) -> Result<(), TaskError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO completed_tasks (username, task_id, task_name, points_earned, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                username,
                task_id,
                task_name,
                points,
                to_iso(Utc::now().naive_utc())
            ],
        )?;
        Ok(())
    }

    /// Points per user for completions at or after `since`, highest total
    /// first; ties break by username so the ordering is stable.
    pub async fn weekly_points(&self, since: NaiveDateTime) -> Result<Vec<UserPoints>, TaskError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT username, SUM(points_earned) AS total_points
             FROM completed_tasks
             WHERE completed_at >= ?1
             GROUP BY username
             ORDER BY total_points DESC, username ASC",
        )?;
        let rows = stmt.query_map(params![to_iso(since)], |row| {
            Ok(UserPoints {
                username: row.get(0)?,
                total: row.get(1)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
impl TaskStore {
    /// Back-date a ledger row, bypassing the append-only API.
    pub(crate) async fn backdate_completion_for_test(&self, username: &str, when: NaiveDateTime) {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE completed_tasks SET completed_at = ?1 WHERE username = ?2",
            params![to_iso(when), username],
        )
        .unwrap();
    }
}
