mod config;
mod core;
mod interfaces;

use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use crate::config::BotConfig;
use crate::core::tasks::TaskStore;
use crate::interfaces::telegram::TelegramInterface;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    if let Err(e) = run().await {
        error!("tidybot exited with error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;
    let store = TaskStore::open(&config.db_path)?;
    if let Some(chat) = store.chat_id().await? {
        info!("Summary delivery target: chat {chat}");
    }
    TelegramInterface::new(config, store).run().await
}
