//! Channel Guardian Bot - Main Entry Point
//!
//! A Telegram bot that manages paid channel subscriptions: a daily accounting
//! pass gated on the admin's posting activity, plus an inline-keyboard admin
//! dashboard.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use channel_guardian_bot::accounting::{AccountingMessage, AccountingRunner};
use channel_guardian_bot::config::BotConfig;
use channel_guardian_bot::dashboard::{self, AppState};
use channel_guardian_bot::ledger::Ledger;
use channel_guardian_bot::telegram::{ChannelClient, Notifier};

/// Telegram bot for paid channel subscription management.
#[derive(Parser, Debug)]
#[command(name = "guardian_bot")]
#[command(about = "Manage paid channel subscriptions from a single admin dashboard")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Override the ledger database path from the environment.
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let mut config =
        BotConfig::from_env().context("Failed to load bot configuration from environment")?;
    if let Some(database) = args.database {
        config.db_path = database.into();
    }

    info!(
        "Managing channel {} for admin {}",
        config.channel_id, config.admin_id
    );

    let ledger = Ledger::open(&config.db_path)
        .await
        .context("Failed to open the subscription ledger")?;
    info!("Ledger opened at {}", config.db_path.display());

    let bot = Bot::new(&config.bot_token);
    let client = ChannelClient::new(bot.clone(), config.admin_id, config.channel_id);

    let notifier: Arc<dyn Notifier> = Arc::new(client.clone());
    let runner = AccountingRunner::new(ledger.clone(), notifier);
    let (accounting_tx, accounting_rx) = mpsc::channel::<AccountingMessage>(8);

    let runner_handle = tokio::spawn(async move {
        runner.run(accounting_rx).await;
    });

    let state = AppState::new(Arc::new(config), ledger, client);

    info!("Starting channel guardian bot...");
    let mut dispatcher = Dispatcher::builder(bot, dashboard::schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    dispatcher.dispatch().await;

    info!("Shutting down...");
    let _ = accounting_tx.send(AccountingMessage::Shutdown).await;
    let _ = runner_handle.await;

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
