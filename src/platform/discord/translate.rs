// ABOUTME: Pure translation of Discord events into the uniform inbound shapes
// ABOUTME: Applies the bot/context/content filters and the registration gate

use tether_core::jid;
use tether_core::{ChatMetadata, InboundMessage};

/// Platform tag reported in chat metadata
pub const PLATFORM: &str = "discord";

/// Chat identifier prefix minted by the Discord adapter
pub const JID_PREFIX: &str = "dc";

/// A Discord message, reduced to what translation needs.
///
/// The gateway layer fills this from the SDK's message type so the rules
/// below stay free of SDK types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscordMessageEvent {
    pub message_id: String,
    pub channel_id: String,
    /// None for direct messages
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub channel_name: Option<String>,
    pub author_id: String,
    pub author_is_bot: bool,
    /// Guild member nickname
    pub member_nick: Option<String>,
    /// Account-wide display name
    pub global_name: Option<String>,
    /// Account handle
    pub username: String,
    pub content: String,
    /// RFC 3339
    pub timestamp: String,
}

/// An application (slash) command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordCommandEvent {
    pub name: String,
    pub channel_id: String,
}

/// The fixed set of Discord events the adapter reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscordEvent {
    Message(DiscordMessageEvent),
    Command(DiscordCommandEvent),
}

/// Why a message event produced no callbacks at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    BotAuthor,
    NoGuild,
    EmptyContent,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::BotAuthor => "bot",
            DropReason::NoGuild => "no_context",
            DropReason::EmptyContent => "empty",
        }
    }
}

/// Outcome of translating one message event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Dropped(DropReason),
    /// Unregistered conversation: metadata only
    Catalogued(ChatMetadata),
    /// Registered conversation: metadata and the full message
    Relayed(ChatMetadata, InboundMessage),
}

/// First non-empty of nickname, global display name, username
pub fn resolve_sender_name(nick: Option<&str>, global_name: Option<&str>, username: &str) -> String {
    [nick, global_name, Some(username)]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .unwrap_or(username)
        .to_string()
}

/// Human-readable conversation name: `<guild> #<channel>` when both are known
pub fn chat_display_name(guild_name: Option<&str>, channel_name: Option<&str>, chat_jid: &str) -> String {
    match (
        guild_name.filter(|g| !g.is_empty()),
        channel_name.filter(|c| !c.is_empty()),
    ) {
        (Some(guild), Some(channel)) => format!("{} #{}", guild, channel),
        (None, Some(channel)) => format!("#{}", channel),
        _ => chat_jid.to_string(),
    }
}

pub fn chat_jid_for(channel_id: &str) -> String {
    jid::format_jid(JID_PREFIX, channel_id)
}

/// Apply the drop filters, then consult `is_registered` for the chat id.
/// The lookup only runs for events that survive the filters.
pub fn translate_message(
    event: &DiscordMessageEvent,
    is_registered: impl FnOnce(&str) -> bool,
) -> Translation {
    if event.author_is_bot {
        return Translation::Dropped(DropReason::BotAuthor);
    }
    if event.guild_id.is_none() {
        return Translation::Dropped(DropReason::NoGuild);
    }
    if event.content.is_empty() {
        return Translation::Dropped(DropReason::EmptyContent);
    }

    let chat_jid = chat_jid_for(&event.channel_id);
    let metadata = ChatMetadata {
        chat_jid: chat_jid.clone(),
        timestamp: event.timestamp.clone(),
        display_name: chat_display_name(
            event.guild_name.as_deref(),
            event.channel_name.as_deref(),
            &chat_jid,
        ),
        platform: PLATFORM.to_string(),
        is_direct: false,
    };

    if !is_registered(&chat_jid) {
        return Translation::Catalogued(metadata);
    }

    let message = InboundMessage {
        id: event.message_id.clone(),
        chat_jid,
        sender: event.author_id.clone(),
        sender_name: resolve_sender_name(
            event.member_nick.as_deref(),
            event.global_name.as_deref(),
            &event.username,
        ),
        content: event.content.clone(),
        timestamp: event.timestamp.clone(),
        is_from_me: false,
        is_bot_message: false,
    };
    Translation::Relayed(metadata, message)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> DiscordMessageEvent {
        DiscordMessageEvent {
            message_id: "1001".to_string(),
            channel_id: "2002".to_string(),
            guild_id: Some("3003".to_string()),
            guild_name: Some("Home".to_string()),
            channel_name: Some("general".to_string()),
            author_id: "4004".to_string(),
            author_is_bot: false,
            member_nick: None,
            global_name: Some("Alice".to_string()),
            username: "alice123".to_string(),
            content: "hello there".to_string(),
            timestamp: "2026-10-18T12:00:00+00:00".to_string(),
        }
    }

    fn registered<'a>(jids: &'a [&'a str]) -> impl FnOnce(&str) -> bool + 'a {
        move |chat_jid| jids.iter().any(|j| *j == chat_jid)
    }

    #[test]
    fn test_sender_name_falls_back_past_empty_nick() {
        assert_eq!(resolve_sender_name(Some(""), Some("Al"), "alice123"), "Al");
    }

    #[test]
    fn test_sender_name_prefers_nick() {
        assert_eq!(resolve_sender_name(Some("Boss"), Some("Al"), "alice123"), "Boss");
    }

    #[test]
    fn test_sender_name_falls_back_to_username() {
        assert_eq!(resolve_sender_name(None, None, "alice123"), "alice123");
        assert_eq!(resolve_sender_name(Some(""), Some(""), "alice123"), "alice123");
    }

    #[test]
    fn test_display_name_variants() {
        assert_eq!(chat_display_name(Some("Home"), Some("general"), "dc:1"), "Home #general");
        assert_eq!(chat_display_name(None, Some("general"), "dc:1"), "#general");
        assert_eq!(chat_display_name(Some("Home"), None, "dc:1"), "dc:1");
        assert_eq!(chat_display_name(Some(""), Some(""), "dc:1"), "dc:1");
    }

    #[test]
    fn test_bot_author_dropped() {
        let ev = DiscordMessageEvent {
            author_is_bot: true,
            ..event()
        };
        assert_eq!(
            translate_message(&ev, registered(&["dc:2002"])),
            Translation::Dropped(DropReason::BotAuthor)
        );
    }

    #[test]
    fn test_direct_message_dropped() {
        let ev = DiscordMessageEvent {
            guild_id: None,
            ..event()
        };
        assert_eq!(
            translate_message(&ev, registered(&["dc:2002"])),
            Translation::Dropped(DropReason::NoGuild)
        );
    }

    #[test]
    fn test_empty_content_dropped() {
        let ev = DiscordMessageEvent {
            content: String::new(),
            ..event()
        };
        assert_eq!(
            translate_message(&ev, registered(&["dc:2002"])),
            Translation::Dropped(DropReason::EmptyContent)
        );
    }

    #[test]
    fn test_unregistered_is_catalogued_only() {
        match translate_message(&event(), registered(&["dc:9999"])) {
            Translation::Catalogued(meta) => {
                assert_eq!(meta.chat_jid, "dc:2002");
                assert_eq!(meta.display_name, "Home #general");
                assert_eq!(meta.platform, "discord");
                assert!(!meta.is_direct);
                assert_eq!(meta.timestamp, "2026-10-18T12:00:00+00:00");
            }
            other => panic!("expected Catalogued, got {:?}", other),
        }
    }

    #[test]
    fn test_registered_is_relayed() {
        match translate_message(&event(), registered(&["dc:2002"])) {
            Translation::Relayed(meta, msg) => {
                assert_eq!(meta.chat_jid, "dc:2002");
                assert_eq!(msg.id, "1001");
                assert_eq!(msg.chat_jid, "dc:2002");
                assert_eq!(msg.sender, "4004");
                assert_eq!(msg.sender_name, "Alice");
                assert_eq!(msg.content, "hello there");
                assert!(!msg.is_from_me);
                assert!(!msg.is_bot_message);
            }
            other => panic!("expected Relayed, got {:?}", other),
        }
    }

    #[test]
    fn test_dropped_events_skip_registration_lookup() {
        let ev = DiscordMessageEvent {
            author_is_bot: true,
            ..event()
        };
        let outcome = translate_message(&ev, |_| panic!("lookup must not run for dropped events"));
        assert_eq!(outcome, Translation::Dropped(DropReason::BotAuthor));
    }

    #[test]
    fn test_drop_reason_labels() {
        assert_eq!(DropReason::BotAuthor.as_str(), "bot");
        assert_eq!(DropReason::NoGuild.as_str(), "no_context");
        assert_eq!(DropReason::EmptyContent.as_str(), "empty");
    }
}
