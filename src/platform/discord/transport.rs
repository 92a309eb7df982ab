// ABOUTME: Seam between the Discord adapter and the Discord SDK
// ABOUTME: Gateway lifecycle plus the three REST calls the adapter needs

use async_trait::async_trait;
use std::sync::Arc;
use tether_core::ChannelError;

use super::handler::InboundHandler;

/// What a channel id resolved to on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Accepts text messages
    Text,
    /// Exists but can't carry text (voice, category, forum)
    Other,
}

/// Everything the adapter asks of the platform.
///
/// `open` must resolve only after the session is ready, having called
/// `InboundHandler::on_ready`. Incoming events are delivered to the handler
/// for as long as the session lives.
#[async_trait]
pub trait DiscordTransport: Send + Sync {
    async fn open(&self, handler: Arc<InboundHandler>) -> Result<(), ChannelError>;

    /// Tear down the session. Safe to call when nothing is open.
    async fn close(&self);

    async fn channel_kind(&self, channel_id: u64) -> Result<ChannelKind, ChannelError>;

    async fn send_text(&self, channel_id: u64, text: &str) -> Result<(), ChannelError>;

    /// Show the typing indicator once; the platform expires it on its own
    async fn start_typing(&self, channel_id: u64) -> Result<(), ChannelError>;
}
