// ABOUTME: Command-line entry point for the tether bridge
// ABOUTME: run relays Discord and due tasks onto stdout, schedule drops a task file, send posts one message

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tether::config::Config;
use tether::{logging, paths};
use tether::{ChannelRouter, RouterBus, RouterEvent, TaskQueue};

/// Bridge chat platforms to an assistant message bus
#[derive(Parser)]
#[command(name = "tether", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect adapters and stream router events as JSON lines on stdout
    Run,
    /// Queue a one-shot task for the running bridge
    Schedule {
        /// What the assistant should do
        #[arg(long)]
        prompt: String,
        /// Chat id to answer in, e.g. dc:1234567890
        #[arg(long)]
        target: String,
        /// Seconds until the task is due (default from config)
        #[arg(long)]
        delay_secs: Option<u64>,
        /// Task directory (default from config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Send one message and exit
    Send {
        #[arg(long)]
        target: String,
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run => {
            let _guard = logging::init_daemon(&paths::log_dir())?;
            handle_run(Config::load()?).await
        }
        Command::Schedule {
            prompt,
            target,
            delay_secs,
            dir,
        } => {
            logging::init_cli();
            handle_schedule(Config::load()?, prompt, target, delay_secs, dir).await
        }
        Command::Send { target, text } => {
            logging::init_cli();
            handle_send(Config::load()?, target, text).await
        }
    }
}

/// Router with every configured adapter attached
fn build_router(config: &Config, bus: Arc<RouterBus>) -> Result<ChannelRouter> {
    let mut router = ChannelRouter::new(Arc::clone(&bus));

    #[cfg(feature = "discord")]
    {
        let discord = config.discord_config()?.clone();
        router.add_channel(Arc::new(tether::platform::DiscordChannel::new(
            discord,
            &config.assistant.name,
            bus,
        )));
    }

    if router.is_empty() {
        anyhow::bail!(
            "No chat platforms available (assistant: {}); build with --features discord",
            config.assistant.name
        );
    }
    Ok(router)
}

async fn handle_run(config: Config) -> Result<()> {
    tracing::info!(
        assistant = %config.assistant.name,
        registered = config.registered.len(),
        tasks_dir = %config.tasks.dir,
        "Starting tether"
    );

    let (bus, mut events) = RouterBus::new(config.registered_groups());
    let router = build_router(&config, Arc::clone(&bus))?;
    router.connect_all().await?;

    let queue = TaskQueue::new(&config.tasks.dir);
    let mut poll = tokio::time::interval(Duration::from_secs(config.tasks.poll_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&event)?,
            _ = poll.tick() => match queue.take_due(chrono::Utc::now()).await {
                Ok(due) => {
                    for queued in due {
                        tracing::info!(file = %queued.file_name, target = %queued.task.target_jid, "Forwarding scheduled task");
                        bus.publish_task(queued.task);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to read task queue"),
            },
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    router.disconnect_all().await;
    Ok(())
}

fn print_event(event: &RouterEvent) -> Result<()> {
    let line = serde_json::to_string(event).context("Failed to encode router event")?;
    println!("{}", line);
    Ok(())
}

async fn handle_schedule(
    config: Config,
    prompt: String,
    target: String,
    delay_secs: Option<u64>,
    dir: Option<PathBuf>,
) -> Result<()> {
    tether::jid::ChatJid::parse(&target)
        .with_context(|| format!("Invalid target chat id: {}", target))?;

    let dir = dir.unwrap_or_else(|| PathBuf::from(&config.tasks.dir));
    let delay = Duration::from_secs(delay_secs.unwrap_or(config.tasks.default_delay_secs));
    let path = TaskQueue::new(dir)
        .schedule_once(&prompt, &target, delay)
        .await?;

    println!("{}", path.display());
    Ok(())
}

async fn handle_send(config: Config, target: String, text: String) -> Result<()> {
    let (bus, _events) = RouterBus::new(config.registered_groups());
    let router = build_router(&config, bus)?;
    if router.channel_for(&target).is_none() {
        anyhow::bail!("No channel owns chat id {}", target);
    }

    router.connect_all().await?;
    router.send_message(&target, &text).await;
    router.disconnect_all().await;
    Ok(())
}
