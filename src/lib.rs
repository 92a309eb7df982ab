// ABOUTME: Root library module for the tether bridge
// ABOUTME: Exposes the platform adapters and logging setup, re-exporting tether-core

pub mod logging;
pub mod platform;

// Re-export platform-agnostic modules from tether-core
pub use tether_core::chunk;
pub use tether_core::config;
pub use tether_core::jid;
pub use tether_core::metrics;
pub use tether_core::paths;
pub use tether_core::router;
pub use tether_core::task_queue;
pub use tether_core::traits;

pub use tether_core::{ChannelError, ChannelRouter, RouterBus, RouterEvent, TaskDescriptor, TaskQueue};
