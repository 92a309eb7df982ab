// ABOUTME: Integration tests for the Discord adapter against a mock transport
// ABOUTME: Covers inbound filtering and gating, chunked sends, typing and connection lifecycle
#![cfg(feature = "discord")]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tether::config::DiscordConfig;
use tether::platform::discord::translate::{DiscordCommandEvent, DiscordMessageEvent};
use tether::platform::discord::{
    ChannelKind, DiscordEvent, DiscordTransport, InboundHandler,
};
use tether::platform::DiscordChannel;
use tether::traits::{Channel, ChannelCallbacks, InboundMessage, RegisteredGroup};
use tether::ChannelError;

// =============================================================================
// Test doubles
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Metadata {
        chat_jid: String,
        display_name: String,
        platform: String,
        is_direct: bool,
    },
    Message(InboundMessage),
}

#[derive(Default)]
struct RecordingCallbacks {
    registered: Mutex<HashMap<String, RegisteredGroup>>,
    calls: Mutex<Vec<Call>>,
    lookups: AtomicUsize,
}

impl RecordingCallbacks {
    fn with_registered(jids: &[&str]) -> Arc<Self> {
        let cb = Arc::new(Self::default());
        for jid in jids {
            cb.registered.lock().unwrap().insert(
                jid.to_string(),
                RegisteredGroup {
                    name: jid.to_string(),
                    folder: "main".to_string(),
                    added_at: "2026-01-01T00:00:00+00:00".to_string(),
                },
            );
        }
        cb
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn message_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Message(_)))
            .count()
    }

    fn metadata_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Metadata { .. }))
            .count()
    }
}

impl ChannelCallbacks for RecordingCallbacks {
    fn on_message(&self, _chat_jid: &str, message: InboundMessage) {
        self.calls.lock().unwrap().push(Call::Message(message));
    }

    fn on_chat_metadata(
        &self,
        chat_jid: &str,
        _timestamp: &str,
        display_name: &str,
        platform: &str,
        is_direct: bool,
    ) {
        self.calls.lock().unwrap().push(Call::Metadata {
            chat_jid: chat_jid.to_string(),
            display_name: display_name.to_string(),
            platform: platform.to_string(),
            is_direct,
        });
    }

    fn registered_groups(&self) -> HashMap<String, RegisteredGroup> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.registered.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TransportCall {
    Kind(u64),
    Send(u64, String),
    Typing(u64),
}

/// Transport that records calls and can be told to fail
#[derive(Default)]
struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    fail_open: bool,
    never_ready: bool,
    non_text: bool,
    missing: bool,
    /// 1-based send index that fails
    fail_send_at: Option<usize>,
    closed: Mutex<usize>,
}

impl MockTransport {
    fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    fn sends(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Send(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DiscordTransport for MockTransport {
    async fn open(&self, handler: Arc<InboundHandler>) -> Result<(), ChannelError> {
        if self.fail_open {
            return Err(ChannelError::connection("401 Unauthorized"));
        }
        if self.never_ready {
            std::future::pending::<()>().await;
        }
        handler.on_ready("TestBot");
        Ok(())
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }

    async fn channel_kind(&self, channel_id: u64) -> Result<ChannelKind, ChannelError> {
        self.calls.lock().unwrap().push(TransportCall::Kind(channel_id));
        if self.missing {
            return Err(ChannelError::resolution(format!("dc:{}", channel_id), "Unknown Channel"));
        }
        Ok(if self.non_text {
            ChannelKind::Other
        } else {
            ChannelKind::Text
        })
    }

    async fn send_text(&self, channel_id: u64, text: &str) -> Result<(), ChannelError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(TransportCall::Send(channel_id, text.to_string()));
            calls
                .iter()
                .filter(|c| matches!(c, TransportCall::Send(..)))
                .count()
        };
        if self.fail_send_at == Some(index) {
            return Err(ChannelError::transport(format!("dc:{}", channel_id), "rate limited"));
        }
        Ok(())
    }

    async fn start_typing(&self, channel_id: u64) -> Result<(), ChannelError> {
        self.calls.lock().unwrap().push(TransportCall::Typing(channel_id));
        Ok(())
    }
}

fn adapter(
    transport: MockTransport,
    callbacks: Arc<RecordingCallbacks>,
) -> (DiscordChannel, Arc<MockTransport>) {
    adapter_with(DiscordConfig::new("token"), transport, callbacks)
}

fn adapter_with(
    config: DiscordConfig,
    transport: MockTransport,
    callbacks: Arc<RecordingCallbacks>,
) -> (DiscordChannel, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let channel = DiscordChannel::with_transport(config, "Andy", callbacks, transport.clone());
    (channel, transport)
}

fn guild_message(channel_id: &str) -> DiscordMessageEvent {
    DiscordMessageEvent {
        message_id: "900".to_string(),
        channel_id: channel_id.to_string(),
        guild_id: Some("77".to_string()),
        guild_name: Some("Home".to_string()),
        channel_name: Some("general".to_string()),
        author_id: "555".to_string(),
        author_is_bot: false,
        member_nick: Some(String::new()),
        global_name: Some("Al".to_string()),
        username: "alice123".to_string(),
        content: "what's the weather?".to_string(),
        timestamp: "2026-10-18T09:30:00+00:00".to_string(),
    }
}

// =============================================================================
// Inbound
// =============================================================================

#[tokio::test]
async fn test_bot_authored_message_produces_no_callbacks() {
    let callbacks = RecordingCallbacks::with_registered(&["dc:100"]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks.clone());

    let event = DiscordMessageEvent {
        author_is_bot: true,
        ..guild_message("100")
    };
    channel.handler().dispatch(DiscordEvent::Message(event));

    assert!(callbacks.calls().is_empty());
}

#[tokio::test]
async fn test_direct_and_empty_messages_produce_no_callbacks() {
    let callbacks = RecordingCallbacks::with_registered(&["dc:100"]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks.clone());

    let dm = DiscordMessageEvent {
        guild_id: None,
        ..guild_message("100")
    };
    let empty = DiscordMessageEvent {
        content: String::new(),
        ..guild_message("100")
    };
    channel.handler().dispatch(DiscordEvent::Message(dm));
    channel.handler().dispatch(DiscordEvent::Message(empty));

    assert!(callbacks.calls().is_empty());
}

#[tokio::test]
async fn test_filtered_events_never_read_registration_set() {
    let callbacks = RecordingCallbacks::with_registered(&["dc:100"]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks.clone());

    let filtered = [
        DiscordMessageEvent {
            author_is_bot: true,
            ..guild_message("100")
        },
        DiscordMessageEvent {
            guild_id: None,
            ..guild_message("100")
        },
        DiscordMessageEvent {
            content: String::new(),
            ..guild_message("100")
        },
    ];
    for event in filtered {
        channel.handler().dispatch(DiscordEvent::Message(event));
    }
    assert_eq!(callbacks.lookups.load(Ordering::SeqCst), 0);

    channel
        .handler()
        .dispatch(DiscordEvent::Message(guild_message("100")));
    assert_eq!(callbacks.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unregistered_channel_is_catalogued_not_relayed() {
    let callbacks = RecordingCallbacks::with_registered(&["dc:999"]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks.clone());

    channel
        .handler()
        .dispatch(DiscordEvent::Message(guild_message("100")));

    assert_eq!(callbacks.metadata_count(), 1);
    assert_eq!(callbacks.message_count(), 0);
    assert_eq!(
        callbacks.calls()[0],
        Call::Metadata {
            chat_jid: "dc:100".to_string(),
            display_name: "Home #general".to_string(),
            platform: "discord".to_string(),
            is_direct: false,
        }
    );
}

#[tokio::test]
async fn test_registered_channel_gets_metadata_then_message() {
    let callbacks = RecordingCallbacks::with_registered(&["dc:100"]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks.clone());

    channel
        .handler()
        .dispatch(DiscordEvent::Message(guild_message("100")));

    let calls = callbacks.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], Call::Metadata { .. }));
    match &calls[1] {
        Call::Message(msg) => {
            assert_eq!(msg.chat_jid, "dc:100");
            assert_eq!(msg.sender, "555");
            assert_eq!(msg.sender_name, "Al");
            assert_eq!(msg.content, "what's the weather?");
            assert!(!msg.is_from_me);
            assert!(!msg.is_bot_message);
        }
        other => panic!("expected message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_registration_is_read_per_event() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks.clone());

    channel
        .handler()
        .dispatch(DiscordEvent::Message(guild_message("100")));
    assert_eq!(callbacks.message_count(), 0);

    callbacks.registered.lock().unwrap().insert(
        "dc:100".to_string(),
        RegisteredGroup {
            name: "general".to_string(),
            folder: "main".to_string(),
            added_at: "2026-01-01T00:00:00+00:00".to_string(),
        },
    );
    channel
        .handler()
        .dispatch(DiscordEvent::Message(guild_message("100")));
    assert_eq!(callbacks.message_count(), 1);
}

#[tokio::test]
async fn test_chatid_command_replies_without_callbacks() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks.clone());

    let reply = channel
        .handler()
        .dispatch(DiscordEvent::Command(DiscordCommandEvent {
            name: "chatid".to_string(),
            channel_id: "1234".to_string(),
        }))
        .unwrap();

    assert!(reply.contains("dc:1234"));
    assert!(reply.contains("TETHER_REGISTERED_CHATS=dc:1234"));
    assert!(callbacks.calls().is_empty());
}

// =============================================================================
// Outbound
// =============================================================================

#[tokio::test]
async fn test_send_while_disconnected_makes_no_transport_calls() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, transport) = adapter(MockTransport::default(), callbacks);

    channel.send_message("dc:100", "hello").await;

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_short_send_is_one_prefixed_chunk() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, transport) = adapter(MockTransport::default(), callbacks);
    channel.connect().await.unwrap();

    channel.send_message("dc:100", "Sunny, 21C.").await;

    assert_eq!(
        transport.calls(),
        vec![
            TransportCall::Kind(100),
            TransportCall::Send(100, "**Andy:** Sunny, 21C.".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_long_send_is_chunked_in_order() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, transport) = adapter(MockTransport::default(), callbacks);
    channel.connect().await.unwrap();

    let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    channel.send_message("dc:100", &text).await;

    let sends = transport.sends();
    let prefixed = format!("**Andy:** {}", text);
    assert_eq!(sends.len(), 3);
    assert_eq!(sends[0].chars().count(), 2000);
    assert_eq!(sends[1].chars().count(), 2000);
    assert_eq!(sends[2].chars().count(), prefixed.chars().count() - 4000);
    assert!(sends[0].starts_with("**Andy:** "));
    assert_eq!(sends.concat(), prefixed);
}

#[tokio::test]
async fn test_send_respects_configured_limit() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let config = DiscordConfig {
        max_message_len: 10,
        ..DiscordConfig::new("token")
    };
    let (channel, transport) = adapter_with(config, MockTransport::default(), callbacks);
    channel.connect().await.unwrap();

    channel.send_message("dc:100", "0123456789").await;

    assert_eq!(transport.sends(), vec!["**Andy:** ", "0123456789"]);
}

#[tokio::test]
async fn test_failed_chunk_stops_remaining_chunks() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let transport = MockTransport {
        fail_send_at: Some(2),
        ..Default::default()
    };
    let (channel, transport) = adapter(transport, callbacks);
    channel.connect().await.unwrap();

    let text = "x".repeat(6000);
    channel.send_message("dc:100", &text).await;

    // chunk 1 delivered, chunk 2 attempted and failed, chunks 3-4 never tried
    assert_eq!(transport.sends().len(), 2);
    assert!(channel.is_connected());
}

#[tokio::test]
async fn test_non_text_channel_is_not_sent_to() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let transport = MockTransport {
        non_text: true,
        ..Default::default()
    };
    let (channel, transport) = adapter(transport, callbacks);
    channel.connect().await.unwrap();

    channel.send_message("dc:100", "hello").await;

    assert_eq!(transport.calls(), vec![TransportCall::Kind(100)]);
}

#[tokio::test]
async fn test_unknown_channel_is_not_sent_to() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let transport = MockTransport {
        missing: true,
        ..Default::default()
    };
    let (channel, transport) = adapter(transport, callbacks);
    channel.connect().await.unwrap();

    channel.send_message("dc:100", "hello").await;
    channel.send_message("dc:not-a-number", "hello").await;

    assert!(transport.sends().is_empty());
}

#[tokio::test]
async fn test_typing_true_signals_and_false_is_noop() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, transport) = adapter(MockTransport::default(), callbacks);
    channel.connect().await.unwrap();

    channel.set_typing("dc:100", true).await;
    channel.set_typing("dc:100", false).await;

    assert_eq!(transport.calls(), vec![TransportCall::Typing(100)]);
}

#[tokio::test]
async fn test_typing_while_disconnected_is_noop() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, transport) = adapter(MockTransport::default(), callbacks);

    channel.set_typing("dc:100", true).await;

    assert!(transport.calls().is_empty());
}

// =============================================================================
// Lifecycle and ownership
// =============================================================================

#[tokio::test]
async fn test_owns_only_discord_jids() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks);

    assert!(channel.owns_jid("dc:123"));
    assert!(!channel.owns_jid("tg:123"));
    assert!(!channel.owns_jid("dc"));
    assert!(!channel.owns_jid("dc:"));
    assert!(!channel.owns_jid("123"));
}

#[tokio::test]
async fn test_connect_disconnect_cycle() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, transport) = adapter(MockTransport::default(), callbacks);

    assert!(!channel.is_connected());
    channel.connect().await.unwrap();
    assert!(channel.is_connected());

    channel.disconnect().await;
    assert!(!channel.is_connected());
    assert_eq!(*transport.closed.lock().unwrap(), 1);

    // Second disconnect is a no-op
    channel.disconnect().await;
    assert_eq!(*transport.closed.lock().unwrap(), 1);

    channel.send_message("dc:100", "after").await;
    assert!(transport.sends().is_empty());
}

#[tokio::test]
async fn test_connect_failure_leaves_disconnected() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let transport = MockTransport {
        fail_open: true,
        ..Default::default()
    };
    let (channel, _transport) = adapter(transport, callbacks);

    let err = channel.connect().await.unwrap_err();
    assert!(matches!(err, ChannelError::Connection(_)));
    assert!(!channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_connect_times_out_without_ready() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let transport = MockTransport {
        never_ready: true,
        ..Default::default()
    };
    let (channel, transport) = adapter(transport, callbacks);

    let err = channel.connect().await.unwrap_err();
    assert!(err.to_string().contains("30s"));
    assert!(!channel.is_connected());
    assert_eq!(*transport.closed.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_session_loss_flips_connected() {
    let callbacks = RecordingCallbacks::with_registered(&[]);
    let (channel, _transport) = adapter(MockTransport::default(), callbacks);
    channel.connect().await.unwrap();

    channel.handler().on_session_lost("gateway closed");
    assert!(!channel.is_connected());

    channel.handler().on_session_resumed();
    assert!(channel.is_connected());
}
