// ABOUTME: Platform-agnostic channel adapter contract for the tether bridge
// ABOUTME: Provides traits, chat ids, chunking, the channel router and the file-drop task queue

pub mod chunk;
pub mod config;
pub mod error;
pub mod jid;
pub mod metrics;
pub mod paths;
pub mod router;
pub mod task_queue;
pub mod traits;

pub use error::ChannelError;
pub use router::{ChannelRouter, RouterBus, RouterEvent, RouterEventReceiver};
pub use task_queue::{QueuedTask, TaskDescriptor, TaskQueue};
pub use traits::{Channel, ChannelCallbacks, ChatMetadata, InboundMessage, RegisteredGroup};
