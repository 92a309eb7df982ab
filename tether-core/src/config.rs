// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates registered chat ids and provides sensible defaults for optional fields
use crate::jid::ChatJid;
use crate::paths;
use crate::traits::RegisteredGroup;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable listing extra registered chat ids (comma-separated)
pub const REGISTERED_CHATS_ENV: &str = "TETHER_REGISTERED_CHATS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,
    /// Conversations opted into full message relay
    #[serde(default)]
    pub registered: Vec<RegisteredChat>,
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Name used in the outbound identity prefix
    #[serde(default = "default_assistant_name")]
    pub name: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Platform cap on a single message, in characters
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// How long connect() waits for the gateway Ready event
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

// Custom Debug impl to redact bot_token
impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .field("max_message_len", &self.max_message_len)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_message_len: default_max_message_len(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// One `[[registered]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredChat {
    pub jid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
}

impl RegisteredChat {
    pub fn from_jid(jid: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            name: None,
            folder: None,
            added_at: None,
        }
    }

    /// Expand into the router's record, deriving name/folder from the id
    pub fn to_group(&self, now: &str) -> RegisteredGroup {
        RegisteredGroup {
            name: self.name.clone().unwrap_or_else(|| self.jid.clone()),
            folder: self
                .folder
                .clone()
                .unwrap_or_else(|| folder_for_jid(&self.jid)),
            added_at: self.added_at.clone().unwrap_or_else(|| now.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Shared drop directory for task files
    #[serde(default = "default_tasks_dir")]
    pub dir: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// How far ahead of now a producer schedules a `once` task
    #[serde(default = "default_delay_secs")]
    pub default_delay_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            dir: default_tasks_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            default_delay_secs: default_delay_secs(),
        }
    }
}

fn default_assistant_name() -> String {
    "Andy".to_string()
}

fn default_max_message_len() -> usize {
    2000
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_tasks_dir() -> String {
    paths::tasks_dir().to_string_lossy().into_owned()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_delay_secs() -> u64 {
    15
}

/// `dc:123` -> `dc-123`
fn folder_for_jid(jid: &str) -> String {
    jid.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new() {
            return home.home_dir().join(rest).to_string_lossy().into_owned();
        }
        tracing::warn!("Failed to expand tilde: could not determine home directory");
    }
    path.to_string()
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. TETHER_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/tether/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("TETHER_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration from config.toml with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if let Some(config_path) = Self::find_config_file() {
            tracing::info!(
                path = %config_path.display(),
                "Loading configuration from file"
            );
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(content)?)
    }

    /// Apply environment overrides through `lookup` (std::env::var in production)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(val) = lookup("ASSISTANT_NAME") {
            self.assistant.name = val;
        }
        if let Some(val) = lookup("DISCORD_BOT_TOKEN") {
            match self.discord.as_mut() {
                Some(discord) => discord.bot_token = val,
                None => self.discord = Some(DiscordConfig::new(val)),
            }
        }
        if let Some(val) = lookup("DISCORD_MAX_MESSAGE_LEN") {
            let len = val.parse().with_context(|| {
                format!("DISCORD_MAX_MESSAGE_LEN must be a number, got: {}", val)
            })?;
            if let Some(discord) = self.discord.as_mut() {
                discord.max_message_len = len;
            }
        }
        if let Some(val) = lookup(REGISTERED_CHATS_ENV) {
            for jid in val.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !self.registered.iter().any(|r| r.jid == jid) {
                    self.registered.push(RegisteredChat::from_jid(jid));
                }
            }
        }
        if let Some(val) = lookup("TETHER_TASKS_DIR") {
            self.tasks.dir = val;
        }
        if let Some(val) = lookup("TETHER_TASK_POLL_SECS") {
            self.tasks.poll_interval_secs = val.parse().with_context(|| {
                format!("TETHER_TASK_POLL_SECS must be a number, got: {}", val)
            })?;
        }

        self.tasks.dir = expand_tilde(&self.tasks.dir);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.assistant.name.trim().is_empty() {
            anyhow::bail!("assistant.name must not be empty");
        }
        if let Some(discord) = &self.discord {
            if discord.bot_token.trim().is_empty() {
                anyhow::bail!(
                    "discord.bot_token is required (set in config.toml or DISCORD_BOT_TOKEN env var)"
                );
            }
            if discord.max_message_len == 0 {
                anyhow::bail!("discord.max_message_len must be greater than zero");
            }
            if discord.connect_timeout_secs == 0 {
                anyhow::bail!("discord.connect_timeout_secs must be greater than zero");
            }
        }
        for chat in &self.registered {
            ChatJid::parse(&chat.jid)
                .with_context(|| format!("Invalid registered chat id: {}", chat.jid))?;
        }
        if self.tasks.poll_interval_secs == 0 {
            anyhow::bail!("tasks.poll_interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// Registration set keyed by chat id
    pub fn registered_groups(&self) -> HashMap<String, RegisteredGroup> {
        let now = chrono::Utc::now().to_rfc3339();
        self.registered
            .iter()
            .map(|chat| (chat.jid.clone(), chat.to_group(&now)))
            .collect()
    }

    /// Get a reference to the Discord config, returning an error if not configured.
    pub fn discord_config(&self) -> Result<&DiscordConfig> {
        self.discord.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Discord is not configured (set DISCORD_BOT_TOKEN or [discord] in config.toml)")
        })
    }
}
