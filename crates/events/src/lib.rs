//! Banner event publishing: a bounded in-process queue drained by a
//! background task onto the event stream, flushed on shutdown.

#![warn(clippy::unwrap_used)]

pub mod publisher;
pub mod transport;

pub use publisher::{PublisherStats, QueuedPublisher};
pub use transport::EventTransport;

use rotator_core::config::NatsConfig;
use rotator_core::event_bus::{noop_sink, EventSink};
use std::sync::Arc;
use tracing::info;

/// Connect to NATS and return a queued publisher over it.
pub async fn connect_nats(config: &NatsConfig) -> anyhow::Result<QueuedPublisher> {
    let url = config
        .urls
        .first()
        .cloned()
        .unwrap_or_else(|| "nats://localhost:4222".to_string());

    info!(url = %url, "Connecting to NATS");

    let client = async_nats::ConnectOptions::new()
        .max_reconnects(Some(config.max_reconnects))
        .connect(&url)
        .await?;

    info!("NATS connection established");

    Ok(QueuedPublisher::spawn(
        Arc::new(client),
        config.subject_prefix.clone(),
        config.queue_capacity,
    ))
}

/// The sink request handlers emit into, plus the publisher behind it when
/// the event stream is enabled.
pub struct EventStream {
    publisher: Option<Arc<QueuedPublisher>>,
}

impl EventStream {
    /// Events are discarded.
    pub fn disabled() -> Self {
        Self { publisher: None }
    }

    pub fn with_publisher(publisher: QueuedPublisher) -> Self {
        Self {
            publisher: Some(Arc::new(publisher)),
        }
    }

    /// Connect to NATS when `nats.enabled`, otherwise a disabled stream.
    pub async fn connect(config: &NatsConfig) -> anyhow::Result<Self> {
        if !config.enabled {
            info!("Event stream disabled, banner events will be discarded");
            return Ok(Self::disabled());
        }
        Ok(Self::with_publisher(connect_nats(config).await?))
    }

    pub fn is_enabled(&self) -> bool {
        self.publisher.is_some()
    }

    pub fn sink(&self) -> Arc<dyn EventSink> {
        match &self.publisher {
            Some(publisher) => {
                let sink: Arc<dyn EventSink> = publisher.clone();
                sink
            }
            None => noop_sink(),
        }
    }

    /// Flush queued events and stop the publisher. Sinks handed out earlier
    /// drop anything emitted afterwards.
    pub async fn close(&self) {
        if let Some(publisher) = &self.publisher {
            publisher.shutdown().await;
        }
    }
}
