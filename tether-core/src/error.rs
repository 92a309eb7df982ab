// ABOUTME: Typed error taxonomy for channel adapters
// ABOUTME: Only connection failures propagate; transport and resolution errors are logged

/// Errors raised by channel adapters.
///
/// `connect()` is the only operation that returns one of these to its caller.
/// Send and typing paths construct them for logging and then swallow them.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Login or session establishment failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// A single send or fetch against the platform failed
    #[error("transport error for {chat_jid}: {message}")]
    Transport { chat_jid: String, message: String },

    /// The chat identifier does not map to a usable conversation
    #[error("cannot resolve {chat_jid}: {reason}")]
    Resolution { chat_jid: String, reason: String },

    /// The identifier is not of the form `<prefix>:<native-id>`
    #[error("invalid chat identifier: {0:?}")]
    InvalidJid(String),
}

impl ChannelError {
    #[must_use]
    pub fn connection(message: impl std::fmt::Display) -> Self {
        Self::Connection(message.to_string())
    }

    #[must_use]
    pub fn transport(chat_jid: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            chat_jid: chat_jid.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn resolution(chat_jid: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Resolution {
            chat_jid: chat_jid.into(),
            reason: reason.to_string(),
        }
    }
}
