// ABOUTME: Slash commands the Discord adapter registers and answers itself
// ABOUTME: /chatid reports the conversation id and how to register it, /ping checks liveness

use tether_core::config::REGISTERED_CHATS_ENV;

use super::translate::chat_jid_for;

/// A slash command as registered with Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDef {
    pub name: &'static str,
    pub description: &'static str,
}

pub const CHATID: CommandDef = CommandDef {
    name: "chatid",
    description: "Show this channel's chat ID for registration",
};

pub const PING: CommandDef = CommandDef {
    name: "ping",
    description: "Check whether the assistant is online",
};

/// Everything registered globally on ready
pub const COMMANDS: [CommandDef; 2] = [CHATID, PING];

/// Reply text for `/chatid` in the given channel
pub fn chat_id_reply(channel_id: &str) -> String {
    let chat_jid = chat_jid_for(channel_id);
    format!(
        "Chat ID: `{jid}`\nTo relay this channel, add it to the registered set:\n`{env}={jid}`",
        jid = chat_jid,
        env = REGISTERED_CHATS_ENV,
    )
}

pub fn ping_reply(assistant_name: &str) -> String {
    format!("{} is online.", assistant_name)
}

/// Ephemeral reply for a command, or None when the command isn't ours
pub fn reply_for(command: &str, channel_id: &str, assistant_name: &str) -> Option<String> {
    match command {
        name if name == CHATID.name => Some(chat_id_reply(channel_id)),
        name if name == PING.name => Some(ping_reply(assistant_name)),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
