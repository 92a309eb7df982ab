// ABOUTME: Platform adapters for tether
// ABOUTME: Each adapter implements tether_core::Channel behind its own cargo feature

#[cfg(feature = "discord")]
pub mod discord;

#[cfg(feature = "discord")]
pub use discord::DiscordChannel;
