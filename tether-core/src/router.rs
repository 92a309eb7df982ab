// ABOUTME: Channel router that holds connected adapters and the registration set
// ABOUTME: Publishes adapter callbacks onto a bus and routes outbound traffic by owns_jid

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::task_queue::TaskDescriptor;
use crate::traits::{Channel, ChannelCallbacks, ChatMetadata, InboundMessage, RegisteredGroup};

/// Everything the router publishes toward the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouterEvent {
    /// Full message from a registered conversation
    Message(InboundMessage),
    /// Discovery record for any observed conversation
    ChatMetadata(ChatMetadata),
    /// Due task taken off the file-drop queue
    ScheduledTask(TaskDescriptor),
}

/// Receiving end of the router bus
pub type RouterEventReceiver = mpsc::UnboundedReceiver<RouterEvent>;

/// Router-side implementation of the adapter callbacks.
///
/// Owns the registration set; adapters only ever read it through
/// `registered_groups()`.
pub struct RouterBus {
    groups: RwLock<HashMap<String, RegisteredGroup>>,
    tx: mpsc::UnboundedSender<RouterEvent>,
}

impl RouterBus {
    pub fn new(groups: HashMap<String, RegisteredGroup>) -> (Arc<Self>, RouterEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Arc::new(Self {
            groups: RwLock::new(groups),
            tx,
        });
        (bus, rx)
    }

    /// Opt a conversation into full relay. Replaces any existing record.
    pub fn register_group(&self, chat_jid: &str, group: RegisteredGroup) {
        match self.groups.write() {
            Ok(mut groups) => {
                groups.insert(chat_jid.to_string(), group);
                tracing::info!(chat_jid = %chat_jid, "Registered group");
            }
            Err(e) => tracing::error!(error = %e, "Registered group lock poisoned"),
        }
    }

    /// Returns the removed record, if any
    pub fn unregister_group(&self, chat_jid: &str) -> Option<RegisteredGroup> {
        match self.groups.write() {
            Ok(mut groups) => groups.remove(chat_jid),
            Err(e) => {
                tracing::error!(error = %e, "Registered group lock poisoned");
                None
            }
        }
    }

    /// Publish a due scheduled task onto the bus
    pub fn publish_task(&self, task: TaskDescriptor) {
        self.publish(RouterEvent::ScheduledTask(task));
    }

    fn publish(&self, event: RouterEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Router bus receiver dropped");
        }
    }
}

impl ChannelCallbacks for RouterBus {
    fn on_message(&self, chat_jid: &str, message: InboundMessage) {
        tracing::debug!(chat_jid = %chat_jid, id = %message.id, "Inbound message");
        self.publish(RouterEvent::Message(message));
    }

    fn on_chat_metadata(
        &self,
        chat_jid: &str,
        timestamp: &str,
        display_name: &str,
        platform: &str,
        is_direct: bool,
    ) {
        self.publish(RouterEvent::ChatMetadata(ChatMetadata {
            chat_jid: chat_jid.to_string(),
            timestamp: timestamp.to_string(),
            display_name: display_name.to_string(),
            platform: platform.to_string(),
            is_direct,
        }));
    }

    fn registered_groups(&self) -> HashMap<String, RegisteredGroup> {
        match self.groups.read() {
            Ok(groups) => groups.clone(),
            Err(e) => {
                tracing::error!(error = %e, "Registered group lock poisoned");
                HashMap::new()
            }
        }
    }
}

/// Health status for a single channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHealth {
    pub name: String,
    pub connected: bool,
}

/// Set of connected channels. Outbound traffic goes to whichever channel
/// owns the destination id; there are no per-platform branches here.
pub struct ChannelRouter {
    channels: Vec<Arc<dyn Channel>>,
    bus: Arc<RouterBus>,
}

impl ChannelRouter {
    pub fn new(bus: Arc<RouterBus>) -> Self {
        Self {
            channels: Vec::new(),
            bus,
        }
    }

    pub fn add_channel(&mut self, channel: Arc<dyn Channel>) {
        self.channels.push(channel);
    }

    pub fn bus(&self) -> &Arc<RouterBus> {
        &self.bus
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// First channel that owns `chat_jid`
    pub fn channel_for(&self, chat_jid: &str) -> Option<&Arc<dyn Channel>> {
        self.channels.iter().find(|c| c.owns_jid(chat_jid))
    }

    /// Connect every channel in order, stopping at the first failure
    pub async fn connect_all(&self) -> Result<()> {
        for channel in &self.channels {
            channel
                .connect()
                .await
                .map_err(|e| anyhow::anyhow!("{} channel failed to connect: {}", channel.name(), e))?;
            tracing::info!(channel = %channel.name(), "Channel connected");
        }
        Ok(())
    }

    pub async fn disconnect_all(&self) {
        for channel in &self.channels {
            channel.disconnect().await;
        }
    }

    pub async fn send_message(&self, chat_jid: &str, text: &str) {
        match self.channel_for(chat_jid) {
            Some(channel) => channel.send_message(chat_jid, text).await,
            None => tracing::warn!(chat_jid = %chat_jid, "No channel owns chat id, dropping message"),
        }
    }

    pub async fn set_typing(&self, chat_jid: &str, is_typing: bool) {
        if let Some(channel) = self.channel_for(chat_jid) {
            channel.set_typing(chat_jid, is_typing).await;
        }
    }

    pub fn health(&self) -> Vec<ChannelHealth> {
        self.channels
            .iter()
            .map(|c| ChannelHealth {
                name: c.name().to_string(),
                connected: c.is_connected(),
            })
            .collect()
    }
}
