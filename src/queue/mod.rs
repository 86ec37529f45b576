//! Queue transport: message framing plus a Kafka REST proxy client.
//!
//! The relay only sees the [`MessageSource`] and [`MessageProducer`] traits;
//! tests swap in recording fakes.
use anyhow::Result;
use async_trait::async_trait;

pub mod message;
pub mod proxy;

pub use message::{FrameError, Message};
pub use proxy::{ProxyConsumer, ProxyHealth, ProxyProducer};

#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Next batch of messages; empty when nothing is pending.
    async fn consume(&self) -> Result<Vec<Message>>;

    /// Release any server-side consumer state.
    async fn shutdown(&self) -> Result<()>;
}

#[async_trait]
pub trait MessageProducer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;
}
