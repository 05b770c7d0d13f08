//! Outbound message transport used by the publisher's background task.

use async_trait::async_trait;

#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    async fn publish(&self, subject: String, payload: Vec<u8>) -> anyhow::Result<()>;
}

#[async_trait]
impl EventTransport for async_nats::Client {
    async fn publish(&self, subject: String, payload: Vec<u8>) -> anyhow::Result<()> {
        async_nats::Client::publish(self, subject, payload.into()).await?;
        Ok(())
    }
}
