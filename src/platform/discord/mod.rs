// ABOUTME: Discord channel adapter implementing the uniform Channel contract
// ABOUTME: Relays guild messages to the router and sends chunked, name-prefixed replies

pub mod commands;
pub mod gateway;
pub mod handler;
pub mod transport;
pub mod translate;

pub use gateway::SerenityTransport;
pub use handler::InboundHandler;
pub use transport::{ChannelKind, DiscordTransport};
pub use translate::{DiscordEvent, JID_PREFIX, PLATFORM};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tether_core::config::DiscordConfig;
use tether_core::{chunk, jid, metrics};
use tether_core::{Channel, ChannelCallbacks, ChannelError};

/// Discord as a tether channel.
///
/// Owns every chat id of the form `dc:<channel id>`. Inbound messages from
/// guild text channels are relayed only for registered chat ids; everything
/// else is at most catalogued.
pub struct DiscordChannel {
    config: DiscordConfig,
    handler: Arc<InboundHandler>,
    transport: Arc<dyn DiscordTransport>,
}

impl DiscordChannel {
    /// Adapter backed by the real Discord gateway
    pub fn new(
        config: DiscordConfig,
        assistant_name: &str,
        callbacks: Arc<dyn ChannelCallbacks>,
    ) -> Self {
        let transport = Arc::new(SerenityTransport::new(&config.bot_token));
        Self::with_transport(config, assistant_name, callbacks, transport)
    }

    pub fn with_transport(
        config: DiscordConfig,
        assistant_name: &str,
        callbacks: Arc<dyn ChannelCallbacks>,
        transport: Arc<dyn DiscordTransport>,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(InboundHandler::new(callbacks, assistant_name)),
            transport,
        }
    }

    /// Inbound side, for feeding events directly
    pub fn handler(&self) -> &Arc<InboundHandler> {
        &self.handler
    }

    /// Numeric Discord channel id behind a `dc:` chat id
    fn channel_id(chat_jid: &str) -> Result<u64, ChannelError> {
        let native = jid::strip_prefix(chat_jid, JID_PREFIX)
            .ok_or_else(|| ChannelError::resolution(chat_jid, "not a Discord chat id"))?;
        match native.parse::<u64>() {
            Ok(id) if id != 0 => Ok(id),
            _ => Err(ChannelError::resolution(chat_jid, "not a Discord channel id")),
        }
    }

    /// Channel id for a send, or None when the target isn't a text channel
    async fn resolve_text_channel(&self, chat_jid: &str) -> Option<u64> {
        let resolved = match Self::channel_id(chat_jid) {
            Ok(id) => self.transport.channel_kind(id).await.map(|kind| (id, kind)),
            Err(e) => Err(e),
        };

        match resolved {
            Ok((id, ChannelKind::Text)) => Some(id),
            Ok((_, ChannelKind::Other)) => {
                tracing::warn!(chat_jid = %chat_jid, "Discord channel is not text-capable");
                metrics::record_send_failure(PLATFORM, "resolution");
                None
            }
            Err(e) => {
                tracing::warn!(chat_jid = %chat_jid, error = %e, "Discord channel not found");
                metrics::record_send_failure(PLATFORM, "resolution");
                None
            }
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        PLATFORM
    }

    async fn connect(&self) -> Result<(), ChannelError> {
        if self.is_connected() {
            return Ok(());
        }

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        match tokio::time::timeout(timeout, self.transport.open(Arc::clone(&self.handler))).await {
            Ok(Ok(())) => {
                tracing::info!("Discord channel connected");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Discord connect failed");
                Err(e)
            }
            Err(_) => {
                self.transport.close().await;
                self.handler.mark_disconnected();
                tracing::error!(timeout_secs = timeout.as_secs(), "Discord connect timed out");
                Err(ChannelError::connection(format!(
                    "no ready event within {}s",
                    timeout.as_secs()
                )))
            }
        }
    }

    async fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }
        self.handler.mark_disconnected();
        self.transport.close().await;
        tracing::info!("Discord channel disconnected");
    }

    async fn send_message(&self, chat_jid: &str, text: &str) {
        if !self.is_connected() {
            tracing::warn!(chat_jid = %chat_jid, "Discord not connected, dropping message");
            metrics::record_send_failure(PLATFORM, "disconnected");
            return;
        }

        let Some(channel_id) = self.resolve_text_channel(chat_jid).await else {
            return;
        };

        let chunks = chunk::prefixed_chunks(
            self.handler.assistant_name(),
            text,
            self.config.max_message_len,
        );
        let total = chunks.len();

        for (index, part) in chunks.iter().enumerate() {
            if let Err(e) = self.transport.send_text(channel_id, part).await {
                tracing::error!(
                    chat_jid = %chat_jid,
                    chunk = index + 1,
                    total,
                    error = %e,
                    "Failed to send Discord message"
                );
                metrics::record_send_failure(PLATFORM, "transport");
                return;
            }
            metrics::record_chunk_sent(PLATFORM);
        }

        tracing::info!(chat_jid = %chat_jid, length = text.len(), chunks = total, "Discord message sent");
    }

    async fn set_typing(&self, chat_jid: &str, is_typing: bool) {
        // Discord has no stop-typing call; the indicator lapses on its own
        if !is_typing || !self.is_connected() {
            return;
        }

        let channel_id = match Self::channel_id(chat_jid) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(chat_jid = %chat_jid, error = %e, "Typing target unresolved");
                return;
            }
        };
        if let Err(e) = self.transport.start_typing(channel_id).await {
            tracing::debug!(chat_jid = %chat_jid, error = %e, "Failed to send Discord typing indicator");
        }
    }

    fn is_connected(&self) -> bool {
        self.handler.is_connected()
    }

    fn owns_jid(&self, chat_jid: &str) -> bool {
        jid::has_prefix(chat_jid, JID_PREFIX)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_parses_snowflake() {
        assert_eq!(DiscordChannel::channel_id("dc:1234567890").unwrap(), 1234567890);
    }

    #[test]
    fn test_channel_id_rejects_bad_ids() {
        assert!(DiscordChannel::channel_id("dc:general").is_err());
        assert!(DiscordChannel::channel_id("dc:0").is_err());
        assert!(DiscordChannel::channel_id("tg:123").is_err());
        assert!(DiscordChannel::channel_id("dc:").is_err());
    }
}
