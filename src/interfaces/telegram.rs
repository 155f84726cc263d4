use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use teloxide::prelude::*;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::BotConfig;
use crate::core::dialogue::{Dialogue, DialogueMap, EditField};
use crate::core::due::{due_tasks, format_task_line};
use crate::core::error::TaskError;
use crate::core::frequency::parse_frequency;
use crate::core::tasks::TaskStore;
use crate::core::tasks::types::{FieldValue, Task};

const HELP_TEXT: &str = "Cleaning Bot — minimal command interface.\n\n\
Commands:\n\
/addtask - add a task\n\
/tasks   - list all tasks (or /tasks <room>)\n\
/due     - show tasks due now (or /due <room>)\n\
/done    - mark task done (usage: /done <id> or just /done then send id)\n\
/edit    - edit task\n\
/remove  - remove task (usage: /remove <id>)\n\
/rooms   - list available rooms\n\
/points  - show this week's points\n\
/cancel  - cancel current command\n";

pub struct TelegramInterface {
    config: Arc<BotConfig>,
    store: Arc<TaskStore>,
}

impl TelegramInterface {
    pub fn new(config: BotConfig, store: TaskStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let bot = Bot::new(&self.config.token);

        let commands = vec![
            teloxide::types::BotCommand::new("start", "Show all available commands"),
            teloxide::types::BotCommand::new("addtask", "Add a recurring task"),
            teloxide::types::BotCommand::new("tasks", "List all tasks"),
            teloxide::types::BotCommand::new("due", "Show tasks due now"),
            teloxide::types::BotCommand::new("done", "Mark a task done"),
            teloxide::types::BotCommand::new("edit", "Edit a task"),
            teloxide::types::BotCommand::new("remove", "Remove a task"),
            teloxide::types::BotCommand::new("rooms", "List available rooms"),
            teloxide::types::BotCommand::new("points", "Show this week's points"),
            teloxide::types::BotCommand::new("cancel", "Cancel the current command"),
        ];
        if let Err(e) = bot.set_my_commands(commands).await {
            error!("Failed to set telegram bot commands: {}", e);
        }

        let config = self.config.clone();
        let store = self.store.clone();
        let dialogues: Arc<Mutex<DialogueMap>> = Arc::new(Mutex::new(DialogueMap::default()));

        info!("Bot started. Polling...");
        teloxide::repl(bot, move |bot: Bot, msg: Message| {
            let config = config.clone();
            let store = store.clone();
            let dialogues = dialogues.clone();
            async move {
                if let Err(e) = handle_message(&bot, &msg, &config, &store, &dialogues).await {
                    error!("Failed to handle message: {:#}", e);
                    let _ = bot
                        .send_message(msg.chat.id, "Something went wrong. Check the bot logs.")
                        .await;
                }
                Ok(())
            }
        })
        .await;

        Ok(())
    }
}

/// Split "/cmd arg text" into the command (with any "@botname" suffix
/// dropped) and its argument remainder. Non-commands return None.
fn parse_command(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let (head, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    let cmd = head.split('@').next().unwrap_or(head);
    Some((cmd, rest.trim()))
}

async fn handle_message(
    bot: &Bot,
    msg: &Message,
    config: &BotConfig,
    store: &TaskStore,
    dialogues: &Mutex<DialogueMap>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let username = msg
        .from
        .as_ref()
        .and_then(|u| u.username.clone())
        .unwrap_or_default();
    if !config.is_allowed(&username) {
        bot.send_message(msg.chat.id, "Access denied.").await?;
        return Ok(());
    }

    let chat_id = msg.chat.id.0;
    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or_default();

    if let Some((cmd, arg)) = parse_command(text) {
        match cmd {
            "/start" => {
                store.save_chat_id(chat_id).await?;
                bot.send_message(msg.chat.id, HELP_TEXT).await?;
            }
            "/rooms" => cmd_rooms(bot, msg, config).await?,
            "/tasks" => cmd_tasks(bot, msg, config, store, arg).await?,
            "/due" => cmd_due(bot, msg, config, store, arg).await?,
            "/done" => {
                cmd_done(bot, msg, store, dialogues, chat_id, user_id, &username, arg).await?;
            }
            "/remove" => cmd_remove(bot, msg, store, arg).await?,
            "/edit" => cmd_edit(bot, msg, store, dialogues, chat_id, user_id).await?,
            "/addtask" => {
                bot.send_message(msg.chat.id, "What's the task name? (e.g. Clean bathroom)")
                    .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::AddAwaitingName);
            }
            "/points" => cmd_points(bot, msg, store).await?,
            "/cancel" => {
                dialogues.lock().await.cancel(chat_id, user_id);
                bot.send_message(msg.chat.id, "Cancelled.").await?;
            }
            // Unknown commands are ignored.
            _ => {}
        }
        return Ok(());
    }

    dialogue_step(bot, msg, config, store, dialogues, chat_id, user_id, &username, text).await
}

async fn cmd_rooms(bot: &Bot, msg: &Message, config: &BotConfig) -> Result<()> {
    if config.rooms.is_empty() {
        bot.send_message(
            msg.chat.id,
            "No rooms configured. Set the ROOMS environment variable.",
        )
        .await?;
        return Ok(());
    }
    let mut lines = vec!["Available rooms:".to_string()];
    for room in &config.rooms {
        lines.push(format!("• {room}"));
    }
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

async fn cmd_tasks(
    bot: &Bot,
    msg: &Message,
    config: &BotConfig,
    store: &TaskStore,
    arg: &str,
) -> Result<()> {
    if !arg.is_empty() {
        let Some(room) = config.resolve_room(arg) else {
            bot.send_message(msg.chat.id, format!("Unknown room: {arg}"))
                .await?;
            return Ok(());
        };
        let tasks = store.list(Some(room.as_str())).await?;
        if tasks.is_empty() {
            bot.send_message(msg.chat.id, format!("No tasks in {room}."))
                .await?;
            return Ok(());
        }
        let mut lines = vec![format!("Tasks in {room}:")];
        for task in &tasks {
            lines.push(format_task_line(task, true));
        }
        bot.send_message(msg.chat.id, lines.join("\n")).await?;
        return Ok(());
    }

    let tasks = store.list(None).await?;
    if tasks.is_empty() {
        bot.send_message(msg.chat.id, "No tasks yet. Add one with /addtask")
            .await?;
        return Ok(());
    }

    // Group by room, keeping each room's first-appearance order.
    let mut groups: Vec<(String, Vec<&Task>)> = Vec::new();
    for task in &tasks {
        match groups.iter_mut().find(|(room, _)| *room == task.room) {
            Some((_, list)) => list.push(task),
            None => groups.push((task.room.clone(), vec![task])),
        }
    }

    let mut lines = vec!["Your cleaning tasks:".to_string()];
    for (room, room_tasks) in &groups {
        lines.push(format!("\n{room}:"));
        for task in room_tasks {
            lines.push(format_task_line(task, true));
        }
    }
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

async fn cmd_due(
    bot: &Bot,
    msg: &Message,
    config: &BotConfig,
    store: &TaskStore,
    arg: &str,
) -> Result<()> {
    let room_filter = if arg.is_empty() {
        None
    } else {
        match config.resolve_room(arg) {
            Some(room) => Some(room),
            None => {
                bot.send_message(msg.chat.id, format!("Unknown room: {arg}"))
                    .await?;
                return Ok(());
            }
        }
    };

    let tasks = store.list(room_filter.as_deref()).await?;
    let due = due_tasks(&tasks, Utc::now().naive_utc(), None);
    if due.is_empty() {
        let reply = match &room_filter {
            Some(room) => format!("No tasks due in {room}. Good job!"),
            None => "No tasks are due right now. Good job!".to_string(),
        };
        bot.send_message(msg.chat.id, reply).await?;
        return Ok(());
    }

    let header = match &room_filter {
        Some(room) => format!("Tasks due in {room}:"),
        None => "Tasks to do now:".to_string(),
    };
    let mut lines = vec![header];
    for task in &due {
        lines.push(format!(
            "{}. {} — {} — every {}d",
            task.id, task.name, task.room, task.frequency_days
        ));
    }
    lines.push("\nMark a task done with /done <id>".to_string());
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_done(
    bot: &Bot,
    msg: &Message,
    store: &TaskStore,
    dialogues: &Mutex<DialogueMap>,
    chat_id: i64,
    user_id: u64,
    username: &str,
    arg: &str,
) -> Result<()> {
    if !arg.is_empty() {
        let Ok(id) = arg.parse::<i64>() else {
            bot.send_message(msg.chat.id, "Usage: /done <id>  — id is numeric.")
                .await?;
            return Ok(());
        };
        let Some(task) = store.get(id).await? else {
            bot.send_message(msg.chat.id, format!("No task with id {id}."))
                .await?;
            return Ok(());
        };
        let reply = mark_done(store, &task, username).await?;
        bot.send_message(msg.chat.id, reply).await?;
        return Ok(());
    }

    let tasks = store.list(None).await?;
    if tasks.is_empty() {
        bot.send_message(msg.chat.id, "No tasks to mark done.").await?;
        return Ok(());
    }
    let mut lines = vec!["Which task id to mark done? Send the id number.".to_string()];
    for task in &tasks {
        lines.push(format_task_line(task, true));
    }
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    dialogues
        .lock()
        .await
        .set(chat_id, user_id, Dialogue::DoneAwaitingId);
    Ok(())
}

async fn cmd_remove(bot: &Bot, msg: &Message, store: &TaskStore, arg: &str) -> Result<()> {
    if arg.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /remove <id>").await?;
        return Ok(());
    }
    let Ok(id) = arg.parse::<i64>() else {
        bot.send_message(msg.chat.id, "Id must be a number.").await?;
        return Ok(());
    };
    let Some(task) = store.get(id).await? else {
        bot.send_message(msg.chat.id, format!("No task with id {id}."))
            .await?;
        return Ok(());
    };
    store.remove(id).await?;
    bot.send_message(msg.chat.id, format!("Removed task {}: {}", id, task.name))
        .await?;
    Ok(())
}

async fn cmd_edit(
    bot: &Bot,
    msg: &Message,
    store: &TaskStore,
    dialogues: &Mutex<DialogueMap>,
    chat_id: i64,
    user_id: u64,
) -> Result<()> {
    let tasks = store.list(None).await?;
    if tasks.is_empty() {
        bot.send_message(msg.chat.id, "No tasks to edit.").await?;
        return Ok(());
    }
    let mut lines = vec!["Which task id to edit? Send the id number.".to_string()];
    for task in &tasks {
        lines.push(format_task_line(task, true));
    }
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    dialogues
        .lock()
        .await
        .set(chat_id, user_id, Dialogue::EditAwaitingId);
    Ok(())
}

async fn cmd_points(bot: &Bot, msg: &Message, store: &TaskStore) -> Result<()> {
    let since = Utc::now().naive_utc() - Duration::days(7);
    let standings = store.weekly_points(since).await?;
    if standings.is_empty() {
        bot.send_message(msg.chat.id, "No points earned in the last week.")
            .await?;
        return Ok(());
    }
    let mut lines = vec!["Points earned this week:".to_string()];
    for (rank, entry) in standings.iter().enumerate() {
        lines.push(format!("{}. {}: {}", rank + 1, entry.username, entry.total));
    }
    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

async fn mark_done(store: &TaskStore, task: &Task, username: &str) -> Result<String> {
    store.update_last_done(task.id, Utc::now().naive_utc()).await?;
    store
        .record_completion(username, task.id, &task.name, task.points)
        .await?;
    info!(
        "{} completed task {} '{}' (+{} points)",
        username, task.id, task.name, task.points
    );
    Ok(format!(
        "Marked done: {}. Next due in {} days.",
        task.name, task.frequency_days
    ))
}

#[allow(clippy::too_many_arguments)]
async fn dialogue_step(
    bot: &Bot,
    msg: &Message,
    config: &BotConfig,
    store: &TaskStore,
    dialogues: &Mutex<DialogueMap>,
    chat_id: i64,
    user_id: u64,
    username: &str,
    text: &str,
) -> Result<()> {
    let state = dialogues.lock().await.take(chat_id, user_id);
    let Some(state) = state else {
        // Plain text outside any flow is ignored.
        return Ok(());
    };

    match state {
        Dialogue::AddAwaitingName => {
            let name = text.trim().to_string();
            let prompt = if config.rooms.is_empty() {
                "Which room?".to_string()
            } else {
                format!("Which room? ({})", config.rooms.join(", "))
            };
            bot.send_message(msg.chat.id, prompt).await?;
            dialogues
                .lock()
                .await
                .set(chat_id, user_id, Dialogue::AddAwaitingRoom { name });
        }

        Dialogue::AddAwaitingRoom { name } => match config.resolve_room(text) {
            Some(room) => {
                bot.send_message(
                    msg.chat.id,
                    "How often? (e.g. 3d, 1w, 1m — or number of days)",
                )
                .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::AddAwaitingFrequency { name, room });
            }
            None => {
                bot.send_message(
                    msg.chat.id,
                    format!("Unknown room. Please choose from: {}", config.rooms.join(", ")),
                )
                .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::AddAwaitingRoom { name });
            }
        },

        Dialogue::AddAwaitingFrequency { name, room } => {
            match parse_frequency(text) {
                Ok(freq) if freq > 0 => {
                    store.create(&name, freq, &room, "", 1).await?;
                    bot.send_message(
                        msg.chat.id,
                        format!("Added: {name} — {room} — every {freq} days."),
                    )
                    .await?;
                }
                // Zero days would make the task due forever; treat it like
                // any other unparseable answer and end the flow.
                Ok(_) | Err(TaskError::BadFrequency(_)) => {
                    bot.send_message(
                        msg.chat.id,
                        "I couldn't parse that. Use examples like '3d', '1w', '1m' or '7'. Try /addtask again.",
                    )
                    .await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Dialogue::DoneAwaitingId => match text.trim().parse::<i64>() {
            Err(_) => {
                bot.send_message(msg.chat.id, "Please send a numeric id (or /cancel).")
                    .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::DoneAwaitingId);
            }
            Ok(id) => match store.get(id).await? {
                None => {
                    bot.send_message(msg.chat.id, format!("No task with id {id}."))
                        .await?;
                }
                Some(task) => {
                    let reply = mark_done(store, &task, username).await?;
                    bot.send_message(msg.chat.id, reply).await?;
                }
            },
        },

        Dialogue::EditAwaitingId => match text.trim().parse::<i64>() {
            Err(_) => {
                bot.send_message(msg.chat.id, "Send a numeric id (or /cancel).")
                    .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::EditAwaitingId);
            }
            Ok(id) => match store.get(id).await? {
                None => {
                    bot.send_message(msg.chat.id, format!("No task with id {id}."))
                        .await?;
                }
                Some(task) => {
                    bot.send_message(
                        msg.chat.id,
                        format!("What do you want to edit? Reply with {}.", EditField::CHOICES),
                    )
                    .await?;
                    dialogues
                        .lock()
                        .await
                        .set(chat_id, user_id, Dialogue::EditAwaitingField { id: task.id });
                }
            },
        },

        Dialogue::EditAwaitingField { id } => match EditField::parse(text) {
            None => {
                bot.send_message(msg.chat.id, format!("Reply with {}.", EditField::CHOICES))
                    .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::EditAwaitingField { id });
            }
            Some(field) => {
                let prompt = if field == EditField::Room && !config.rooms.is_empty() {
                    format!("Send the new room ({}).", config.rooms.join(", "))
                } else {
                    format!("Send the new value for {}.", field.label())
                };
                bot.send_message(msg.chat.id, prompt).await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::EditAwaitingValue { id, field });
            }
        },

        Dialogue::EditAwaitingValue { id, field } => {
            apply_edit(bot, msg, config, store, dialogues, chat_id, user_id, id, field, text)
                .await?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn apply_edit(
    bot: &Bot,
    msg: &Message,
    config: &BotConfig,
    store: &TaskStore,
    dialogues: &Mutex<DialogueMap>,
    chat_id: i64,
    user_id: u64,
    id: i64,
    field: EditField,
    text: &str,
) -> Result<()> {
    match field {
        EditField::Frequency => match parse_frequency(text) {
            Ok(freq) if freq > 0 => {
                store
                    .update_field(id, field.column(), FieldValue::from(freq))
                    .await?;
                bot.send_message(msg.chat.id, format!("Updated frequency to every {freq} days."))
                    .await?;
            }
            Ok(_) | Err(TaskError::BadFrequency(_)) => {
                bot.send_message(
                    msg.chat.id,
                    "Could not parse frequency. Use '3d', '1w', '1m' or days like '7'.",
                )
                .await?;
            }
            Err(e) => return Err(e.into()),
        },

        EditField::Room => match config.resolve_room(text) {
            Some(room) => {
                store
                    .update_field(id, field.column(), FieldValue::from(room.as_str()))
                    .await?;
                bot.send_message(msg.chat.id, format!("Updated room to {room}."))
                    .await?;
            }
            None => {
                bot.send_message(
                    msg.chat.id,
                    format!("Unknown room. Choose from: {}", config.rooms.join(", ")),
                )
                .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::EditAwaitingValue { id, field });
            }
        },

        EditField::Points => match text.trim().parse::<u32>() {
            Ok(points) if points > 0 => {
                store
                    .update_field(id, field.column(), FieldValue::from(points))
                    .await?;
                bot.send_message(msg.chat.id, format!("Updated points to {points}."))
                    .await?;
            }
            _ => {
                bot.send_message(msg.chat.id, "Send a positive number of points (or /cancel).")
                    .await?;
                dialogues
                    .lock()
                    .await
                    .set(chat_id, user_id, Dialogue::EditAwaitingValue { id, field });
            }
        },

        EditField::Name | EditField::Notes => {
            store
                .update_field(id, field.column(), FieldValue::from(text.trim()))
                .await?;
            bot.send_message(msg.chat.id, format!("Updated {}.", field.label()))
                .await?;
        }
    }
    Ok(())
}
