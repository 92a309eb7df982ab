// ABOUTME: Inbound side of the Discord adapter, independent of the SDK
// ABOUTME: Tracks session readiness and turns translated events into router callbacks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tether_core::metrics;
use tether_core::ChannelCallbacks;
use tokio::sync::oneshot;

use super::commands;
use super::translate::{self, DiscordEvent, DiscordMessageEvent, Translation, PLATFORM};

/// Receives every Discord event for one adapter instance.
///
/// The connected flag lives here so the gateway can flip it from event
/// callbacks and the adapter can read it without locking.
pub struct InboundHandler {
    callbacks: Arc<dyn ChannelCallbacks>,
    assistant_name: String,
    connected: AtomicBool,
    /// Set once the first ready arrives; resumes only count after it
    ready_seen: AtomicBool,
    ready_tx: Mutex<Option<oneshot::Sender<String>>>,
}

impl InboundHandler {
    pub fn new(callbacks: Arc<dyn ChannelCallbacks>, assistant_name: impl Into<String>) -> Self {
        Self {
            callbacks,
            assistant_name: assistant_name.into(),
            connected: AtomicBool::new(false),
            ready_seen: AtomicBool::new(false),
            ready_tx: Mutex::new(None),
        }
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns a receiver that resolves with the bot's name on the next ready
    pub fn arm_ready(&self) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut slot) = self.ready_tx.lock() {
            *slot = Some(tx);
        }
        rx
    }

    pub fn on_ready(&self, bot_name: &str) {
        self.ready_seen.store(true, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(bot_name = %bot_name, "Discord session ready");

        let waiter = self.ready_tx.lock().ok().and_then(|mut slot| slot.take());
        if let Some(tx) = waiter {
            let _ = tx.send(bot_name.to_string());
        }
    }

    /// Session came back without a fresh ready (gateway resume)
    pub fn on_session_resumed(&self) {
        if self.ready_seen.load(Ordering::SeqCst)
            && !self.connected.swap(true, Ordering::SeqCst)
        {
            tracing::info!("Discord session resumed");
        }
    }

    /// Session dropped underneath us. Logs only on the connected -> lost edge.
    pub fn on_session_lost(&self, reason: &str) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::warn!(reason = %reason, "Discord session lost");
        }
    }

    /// Deliberate shutdown: no warning, and later resumes are ignored
    pub fn mark_disconnected(&self) {
        self.ready_seen.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Handle one event. Returns an ephemeral reply for commands we answer.
    pub fn dispatch(&self, event: DiscordEvent) -> Option<String> {
        match event {
            DiscordEvent::Message(message) => {
                self.handle_message(&message);
                None
            }
            DiscordEvent::Command(command) => {
                let reply =
                    commands::reply_for(&command.name, &command.channel_id, &self.assistant_name);
                if reply.is_none() {
                    tracing::debug!(command = %command.name, "Ignoring unknown command");
                }
                reply
            }
        }
    }

    fn handle_message(&self, event: &DiscordMessageEvent) {
        let is_registered = |chat_jid: &str| self.callbacks.registered_groups().contains_key(chat_jid);

        match translate::translate_message(event, is_registered) {
            Translation::Dropped(reason) => {
                metrics::record_inbound_dropped(PLATFORM, reason.as_str());
            }
            Translation::Catalogued(meta) => {
                self.callbacks.on_chat_metadata(
                    &meta.chat_jid,
                    &meta.timestamp,
                    &meta.display_name,
                    &meta.platform,
                    meta.is_direct,
                );
                metrics::record_inbound_catalogued(PLATFORM);
                tracing::debug!(
                    chat_jid = %meta.chat_jid,
                    chat_name = %meta.display_name,
                    "Message from unregistered Discord channel"
                );
            }
            Translation::Relayed(meta, message) => {
                self.callbacks.on_chat_metadata(
                    &meta.chat_jid,
                    &meta.timestamp,
                    &meta.display_name,
                    &meta.platform,
                    meta.is_direct,
                );
                tracing::info!(
                    chat_jid = %message.chat_jid,
                    chat_name = %meta.display_name,
                    sender = %message.sender_name,
                    "Discord message stored"
                );
                self.callbacks.on_message(&meta.chat_jid, message);
                metrics::record_inbound_relayed(PLATFORM);
            }
        }
    }
}
