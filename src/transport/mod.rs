//! Publish/subscribe transports and the tasks built on top of them.

use serde::{Deserialize, Serialize};

pub mod broker;
pub mod gateway;
pub mod in_memory;
pub mod liveness;
pub mod tcp;

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbound {
    pub topic: String,
    pub payload: String,
}

/// Connection to a topic-routed message bus.
///
/// `recv` must be cancel-safe: it is raced against other futures and a message
/// must never be lost when the race is lost.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn subscribe(&mut self, topic: &str) -> anyhow::Result<()>;
    async fn publish(&mut self, topic: &str, payload: &str) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Inbound>;
}
