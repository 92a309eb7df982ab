// ABOUTME: Namespaced chat identifiers of the form `<platform-prefix>:<native-id>`
// ABOUTME: The prefix alone decides which adapter owns a conversation

use std::fmt;

use crate::error::ChannelError;

/// Separator between the platform prefix and the platform-native id
pub const SEPARATOR: char = ':';

/// A parsed chat identifier.
///
/// Identifiers are carried around as plain strings across the router
/// contract; this type is used at the edges where the prefix has to be
/// checked or stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatJid {
    prefix: String,
    native_id: String,
}

impl ChatJid {
    /// Mint an identifier for a platform-native id
    pub fn new(prefix: impl Into<String>, native_id: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            native_id: native_id.into(),
        }
    }

    /// Parse `<prefix>:<native-id>`. Both halves must be non-empty.
    pub fn parse(raw: &str) -> Result<Self, ChannelError> {
        let (prefix, native_id) = raw
            .split_once(SEPARATOR)
            .ok_or_else(|| ChannelError::InvalidJid(raw.to_string()))?;
        if prefix.is_empty() || native_id.is_empty() {
            return Err(ChannelError::InvalidJid(raw.to_string()));
        }
        Ok(Self::new(prefix, native_id))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn native_id(&self) -> &str {
        &self.native_id
    }
}

impl fmt::Display for ChatJid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, SEPARATOR, self.native_id)
    }
}

/// Format a chat identifier without allocating a `ChatJid`
pub fn format_jid(prefix: &str, native_id: &str) -> String {
    format!("{}{}{}", prefix, SEPARATOR, native_id)
}

/// True iff `raw` carries exactly `prefix` followed by a non-empty native id
pub fn has_prefix(raw: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    raw.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .is_some_and(|native| !native.is_empty())
}

/// Strip `prefix:` from `raw`, returning the native id
pub fn strip_prefix<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    if !has_prefix(raw, prefix) {
        return None;
    }
    raw.get(prefix.len() + SEPARATOR.len_utf8()..)
}

// =============================================================================
// Tests
// =============================================================================
