// ABOUTME: Core traits and data types for the channel adapter contract
// ABOUTME: Channel (router -> adapter) and ChannelCallbacks (adapter -> router)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ChannelError;

// =============================================================================
// Data Types
// =============================================================================

/// A message relayed from a registered conversation.
///
/// Built once per platform event and handed straight to the router; the
/// adapter never keeps or mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform-native message id, unique within the chat
    pub id: String,
    /// Namespaced chat identifier (e.g. `dc:123`)
    pub chat_jid: String,
    /// Platform-native sender id
    pub sender: String,
    /// Best-effort human-readable sender name
    pub sender_name: String,
    /// Text content
    pub content: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Whether the assistant itself authored this message
    pub is_from_me: bool,
    /// Whether a bot account authored this message
    pub is_bot_message: bool,
}

/// Discovery record emitted for every observed conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub chat_jid: String,
    /// RFC 3339 timestamp of the last observed activity
    pub timestamp: String,
    pub display_name: String,
    /// Platform tag (e.g. "discord")
    pub platform: String,
    pub is_direct: bool,
}

/// A conversation an operator has opted into full message relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredGroup {
    /// Display name
    pub name: String,
    /// Workspace folder the assistant uses for this conversation
    pub folder: String,
    /// RFC 3339 timestamp of registration
    pub added_at: String,
}

// =============================================================================
// Adapter -> Router
// =============================================================================

/// Callbacks an adapter invokes on its router.
///
/// `registered_groups` is polled synchronously on every inbound event, so
/// implementations should return a cheap snapshot.
pub trait ChannelCallbacks: Send + Sync {
    /// Invoked only for registered conversations
    fn on_message(&self, chat_jid: &str, message: InboundMessage);

    /// Invoked for every observed conversation, registered or not
    fn on_chat_metadata(
        &self,
        chat_jid: &str,
        timestamp: &str,
        display_name: &str,
        platform: &str,
        is_direct: bool,
    );

    /// Current registration set, keyed by chat identifier
    fn registered_groups(&self) -> HashMap<String, RegisteredGroup>;
}

// =============================================================================
// Router -> Adapter
// =============================================================================

/// Capability interface implemented once per chat platform.
///
/// A router holds a set of these and never branches on the concrete platform:
/// outbound traffic goes to whichever channel `owns_jid` the destination.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Platform tag (e.g. "discord")
    fn name(&self) -> &str;

    /// Establish the platform session. Resolves once the session is live.
    async fn connect(&self) -> Result<(), ChannelError>;

    /// Tear down the session. No-op when not connected.
    async fn disconnect(&self);

    /// Send text to a chat. Never fails; problems are logged.
    async fn send_message(&self, chat_jid: &str, text: &str);

    /// Best-effort typing hint. Never fails; problems are logged.
    async fn set_typing(&self, chat_jid: &str, is_typing: bool);

    /// Last-known live state
    fn is_connected(&self) -> bool;

    /// Whether this channel minted `chat_jid`
    fn owns_jid(&self, chat_jid: &str) -> bool;
}

// =============================================================================
// Tests
// =============================================================================
