// ABOUTME: Serenity-backed Discord transport: gateway session, slash commands and REST calls
// ABOUTME: The only place that touches serenity types; everything else sees plain events

use async_trait::async_trait;
use serenity::all::{
    Channel as SerenityChannel, ChannelId, Client, Command, Context, CreateCommand,
    CreateInteractionResponse, CreateInteractionResponseMessage, EventHandler, GatewayIntents,
    Http, Interaction, Message, Ready, ShardManager,
};
use serenity::gateway::{ConnectionStage, ShardStageUpdateEvent};
use std::sync::Arc;
use tether_core::ChannelError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::commands;
use super::handler::InboundHandler;
use super::transport::{ChannelKind, DiscordTransport};
use super::translate::{chat_jid_for, DiscordCommandEvent, DiscordEvent, DiscordMessageEvent};

fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Gateway + REST client for one bot token
pub struct SerenityTransport {
    token: String,
    http: Arc<Http>,
    shard_manager: Mutex<Option<Arc<ShardManager>>>,
}

impl SerenityTransport {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            http: Arc::new(Http::new(token)),
            shard_manager: Mutex::new(None),
        }
    }
}

enum Opened {
    Ready(String),
    Ended(String),
}

#[async_trait]
impl DiscordTransport for SerenityTransport {
    async fn open(&self, handler: Arc<InboundHandler>) -> Result<(), ChannelError> {
        let ready = handler.arm_ready();
        let events = GatewayHandler {
            inbound: Arc::clone(&handler),
        };

        let mut client = Client::builder(&self.token, intents())
            .event_handler(events)
            .await
            .map_err(ChannelError::connection)?;
        *self.shard_manager.lock().await = Some(Arc::clone(&client.shard_manager));

        let mut run: JoinHandle<Result<(), serenity::Error>> =
            tokio::spawn(async move { client.start().await });

        let opened = tokio::select! {
            signal = ready => match signal {
                Ok(bot_name) => Opened::Ready(bot_name),
                Err(_) => Opened::Ended("ready signal dropped".to_string()),
            },
            finished = &mut run => Opened::Ended(describe_exit(finished)),
        };

        match opened {
            Opened::Ready(bot_name) => {
                tracing::info!(bot_name = %bot_name, "Discord gateway connected");
                tokio::spawn(watch_session(run, handler));
                Ok(())
            }
            Opened::Ended(reason) => {
                run.abort();
                self.close().await;
                handler.mark_disconnected();
                Err(ChannelError::connection(reason))
            }
        }
    }

    async fn close(&self) {
        let manager = self.shard_manager.lock().await.take();
        if let Some(manager) = manager {
            manager.shutdown_all().await;
            tracing::info!("Discord gateway shut down");
        }
    }

    async fn channel_kind(&self, channel_id: u64) -> Result<ChannelKind, ChannelError> {
        let channel = ChannelId::new(channel_id)
            .to_channel(&self.http)
            .await
            .map_err(|e| ChannelError::resolution(chat_jid_for(&channel_id.to_string()), e))?;

        Ok(match channel {
            SerenityChannel::Guild(gc) if gc.is_text_based() => ChannelKind::Text,
            SerenityChannel::Private(_) => ChannelKind::Text,
            _ => ChannelKind::Other,
        })
    }

    async fn send_text(&self, channel_id: u64, text: &str) -> Result<(), ChannelError> {
        ChannelId::new(channel_id)
            .say(&self.http, text)
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::transport(chat_jid_for(&channel_id.to_string()), e))
    }

    async fn start_typing(&self, channel_id: u64) -> Result<(), ChannelError> {
        ChannelId::new(channel_id)
            .broadcast_typing(&self.http)
            .await
            .map_err(|e| ChannelError::transport(chat_jid_for(&channel_id.to_string()), e))
    }
}

fn describe_exit(finished: Result<Result<(), serenity::Error>, tokio::task::JoinError>) -> String {
    match finished {
        Ok(Ok(())) => "gateway closed".to_string(),
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("gateway task failed: {}", e),
    }
}

/// Flip the adapter offline when the gateway client stops for any reason
async fn watch_session(
    run: JoinHandle<Result<(), serenity::Error>>,
    handler: Arc<InboundHandler>,
) {
    let reason = describe_exit(run.await);
    handler.on_session_lost(&reason);
}

/// Serenity event handler; converts SDK events and hands them on
struct GatewayHandler {
    inbound: Arc<InboundHandler>,
}

impl GatewayHandler {
    async fn message_event(&self, ctx: &Context, msg: &Message) -> DiscordMessageEvent {
        // Names cost a lookup; only fetch them for messages that can be relayed
        let wanted = !msg.author.bot && msg.guild_id.is_some() && !msg.content.is_empty();
        let (guild_name, channel_name) = if wanted {
            let guild_name = msg.guild_id.and_then(|g| g.name(&ctx.cache));
            let channel_name = match msg.channel_id.name(ctx).await {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::debug!(error = %e, channel_id = %msg.channel_id, "Channel name lookup failed");
                    None
                }
            };
            (guild_name, channel_name)
        } else {
            (None, None)
        };

        DiscordMessageEvent {
            message_id: msg.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|g| g.to_string()),
            guild_name,
            channel_name,
            author_id: msg.author.id.to_string(),
            author_is_bot: msg.author.bot,
            member_nick: msg.member.as_ref().and_then(|m| m.nick.clone()),
            global_name: msg.author.global_name.clone(),
            username: msg.author.name.clone(),
            content: msg.content.clone(),
            timestamp: msg.timestamp.to_rfc3339().unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        }
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(guilds = ready.guilds.len(), "Discord ready event");
        self.inbound.on_ready(&ready.user.name);

        let defs: Vec<CreateCommand> = commands::COMMANDS
            .iter()
            .map(|def| CreateCommand::new(def.name).description(def.description))
            .collect();
        match Command::set_global_commands(&ctx.http, defs).await {
            Ok(registered) => {
                tracing::debug!(count = registered.len(), "Registered Discord slash commands")
            }
            Err(e) => tracing::warn!(error = %e, "Failed to register Discord slash commands"),
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let event = self.message_event(&ctx, &msg).await;
        self.inbound.dispatch(DiscordEvent::Message(event));
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let event = DiscordCommandEvent {
            name: command.data.name.clone(),
            channel_id: command.channel_id.to_string(),
        };
        let Some(reply) = self.inbound.dispatch(DiscordEvent::Command(event)) else {
            return;
        };

        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(reply)
                .ephemeral(true),
        );
        if let Err(e) = command.create_response(&ctx.http, response).await {
            tracing::warn!(error = %e, command = %command.data.name, "Failed to answer slash command");
        }
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        match event.new {
            ConnectionStage::Connected => self.inbound.on_session_resumed(),
            ConnectionStage::Disconnected => {
                self.inbound.on_session_lost(&format!("shard {} disconnected", event.shard_id.0))
            }
            _ => {}
        }
    }
}
