use chrono::{Duration, NaiveDateTime};

use crate::core::tasks::types::Task;

/// When a task next needs doing. Never stored; always derived from
/// `last_done` so the two cannot drift apart.
pub fn next_due(last_done: NaiveDateTime, frequency_days: u32) -> NaiveDateTime {
    last_done + Duration::days(i64::from(frequency_days))
}

/// Non-strict: a task due exactly now counts as due.
pub fn is_due(last_done: NaiveDateTime, frequency_days: u32, now: NaiveDateTime) -> bool {
    next_due(last_done, frequency_days) <= now
}

/// Every due task, in the store's ascending-id order, optionally restricted
/// to a room (case-insensitive exact match).
pub fn due_tasks<'a>(
    tasks: &'a [Task],
    now: NaiveDateTime,
    room: Option<&str>,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| room.map_or(true, |r| t.room.to_lowercase() == r.to_lowercase()))
        .filter(|t| is_due(t.last_done, t.frequency_days, now))
        .collect()
}

/// One-line human summary:
/// `<id>. <name> — [<room> — ]every <freq>d — next due: <date>[ — <notes>]`.
pub fn format_task_line(task: &Task, show_room: bool) -> String {
    let due = next_due(task.last_done, task.frequency_days).format("%Y-%m-%d %H:%M UTC");
    let mut line = if show_room {
        format!(
            "{}. {} — {} — every {}d — next due: {}",
            task.id, task.name, task.room, task.frequency_days, due
        )
    } else {
        format!(
            "{}. {} — every {}d — next due: {}",
            task.id, task.name, task.frequency_days, due
        )
    };
    if !task.notes.is_empty() {
        line.push_str(" — ");
        line.push_str(&task.notes);
    }
    line
}
