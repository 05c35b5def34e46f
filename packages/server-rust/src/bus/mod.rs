//! Publish/subscribe bus clients.
//!
//! - [`nats`]: NATS core protocol publisher over TCP
//! - [`memory`]: in-process recorder used by tests and local runs

pub mod memory;
pub mod nats;

pub use memory::{MemoryPublisher, PublishedMessage};
pub use nats::{NatsOptions, NatsPublisher, DEFAULT_NATS_URL};
