use std::collections::HashSet;

use chrono::{NaiveDateTime, Utc};
use rusqlite::params;
use tracing::info;

use super::TaskStore;
use super::ids::allocate_id;
use super::types::{FieldValue, Task, parse_iso, to_iso};
use crate::core::error::TaskError;

/// Fields a caller may change through `update_field`. `last_done` has its own
/// operation; `id` is immutable once assigned.
const EDITABLE_FIELDS: [&str; 5] = ["name", "frequency_days", "room", "notes", "points"];

const TASK_COLUMNS: &str = "id, name, frequency_days, last_done, room, notes, points";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let raw: String = row.get(3)?;
    let last_done = parse_iso(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        frequency_days: row.get(2)?,
        last_done,
        room: row.get(4)?,
        notes: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        points: row.get(6)?,
    })
}

impl TaskStore {
    /// Insert a new task with a freshly allocated id and `last_done` set to
    /// now. Returns the id so the caller can refer to the task immediately.
    pub async fn create(
        &self,
        name: &str,
        frequency_days: u32,
        room: &str,
        notes: &str,
        points: u32,
    ) -> Result<i64, TaskError> {
        if frequency_days == 0 {
            return Err(TaskError::ZeroFrequency);
        }
        if points == 0 {
            return Err(TaskError::ZeroPoints);
        }

        // The id draw and the insert happen under one lock acquisition, so
        // concurrent creates cannot both claim the same free id.
        let db = self.db.lock().await;
        let mut stmt = db.prepare("SELECT id FROM tasks")?;
        let existing = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
        drop(stmt);

        let id = allocate_id(&existing)?;
        db.execute(
            "INSERT INTO tasks (id, name, frequency_days, last_done, room, notes, points)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                name,
                frequency_days,
                to_iso(Utc::now().naive_utc()),
                room,
                notes,
                points
            ],
        )?;
        info!("Added task {id} '{name}' in {room}, every {frequency_days}d");
        Ok(id)
    }

    /// All tasks ordered by ascending id, optionally restricted to an exact
    /// stored room value. Callers resolve user input to the canonical room
    /// spelling before querying.
    pub async fn list(&self, room: Option<&str>) -> Result<Vec<Task>, TaskError> {
        let db = self.db.lock().await;
        let mut tasks = Vec::new();
        if let Some(room) = room {
            let mut stmt = db.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE room = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([room], row_to_task)?;
            for row in rows {
                tasks.push(row?);
            }
        } else {
            let mut stmt = db.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))?;
            let rows = stmt.query_map([], row_to_task)?;
            for row in rows {
                tasks.push(row?);
            }
        }
        Ok(tasks)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
        let mut rows = stmt.query_map([id], row_to_task)?;
        match rows.next() {
            Some(task) => Ok(Some(task?)),
            None => Ok(None),
        }
    }

    /// Change exactly one editable field. Unknown field names are a caller
    /// defect, not a user-facing condition.
    pub async fn update_field(
        &self,
        id: i64,
        field: &str,
        value: FieldValue,
    ) -> Result<(), TaskError> {
        if !EDITABLE_FIELDS.contains(&field) {
            return Err(TaskError::InvalidField(field.to_string()));
        }
        if field == "frequency_days" && matches!(value, FieldValue::Int(n) if n < 1) {
            return Err(TaskError::ZeroFrequency);
        }
        if field == "points" && matches!(value, FieldValue::Int(n) if n < 1) {
            return Err(TaskError::ZeroPoints);
        }

        let db = self.db.lock().await;
        // `field` is validated against the allow-list above, so the
        // interpolation cannot inject arbitrary SQL.
        let updated = db.execute(
            &format!("UPDATE tasks SET {field} = ?1 WHERE id = ?2"),
            params![value, id],
        )?;
        if updated == 0 {
            return Err(TaskError::NotFound(id));
        }
        Ok(())
    }

    /// Set `last_done`. Used both by "mark done" and by callers simulating
    /// elapsed time.
    pub async fn update_last_done(&self, id: i64, when: NaiveDateTime) -> Result<(), TaskError> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE tasks SET last_done = ?1 WHERE id = ?2",
            params![to_iso(when), id],
        )?;
        if updated == 0 {
            return Err(TaskError::NotFound(id));
        }
        Ok(())
    }

    /// Delete a task permanently. Referencing an id that no longer exists is
    /// a caller error; chat handlers confirm existence with `get` first.
    pub async fn remove(&self, id: i64) -> Result<(), TaskError> {
        let db = self.db.lock().await;
        let deleted = db.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(TaskError::NotFound(id));
        }
        info!("Removed task {id}");
        Ok(())
    }
}

#[cfg(test)]
impl TaskStore {
    /// Occupy every id in [100, 999] so allocation has nowhere left to land.
    pub(crate) async fn fill_all_ids_for_test(&self) {
        let db = self.db.lock().await;
        let mut stmt = db
            .prepare(
                "INSERT OR IGNORE INTO tasks (id, name, frequency_days, last_done, room, notes, points)
                 VALUES (?1, ?2, 1, '2024-01-01T00:00:00.000000', 'Hall', '', 1)",
            )
            .unwrap();
        for id in 100..=999 {
            stmt.execute(params![id, format!("Task {id}")]).unwrap();
        }
    }
}
