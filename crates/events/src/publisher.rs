//! Non-blocking banner event publisher.
//!
//! `emit` enqueues onto a bounded channel and returns immediately; a full
//! queue drops the event. A background task serializes each event to JSON
//! and publishes it to `{subject_prefix}.{event_type}`. Publish failures are
//! logged and counted, never surfaced to the caller.
//!
//! `shutdown` closes the queue to new events and waits for the worker to
//! publish whatever was already queued. It works through a shared reference,
//! so request handlers may still hold the publisher as a sink.

use crate::transport::EventTransport;
use rotator_core::event_bus::EventSink;
use rotator_core::types::BannerEvent;
use rotator_core::{CancelHandle, CancelToken};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Delivery counters, shared between the publisher and its worker.
#[derive(Debug, Default)]
pub struct PublisherStats {
    pub queued: AtomicU64,
    pub dropped: AtomicU64,
    pub published: AtomicU64,
    pub publish_errors: AtomicU64,
}

pub struct QueuedPublisher {
    sender: mpsc::Sender<BannerEvent>,
    stats: Arc<PublisherStats>,
    stop: CancelHandle,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedPublisher {
    /// Spawn the background publish task. Must be called inside a Tokio runtime.
    pub fn spawn(
        transport: Arc<dyn EventTransport>,
        subject_prefix: String,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel::<BannerEvent>(capacity.max(1));
        let stats = Arc::new(PublisherStats::default());
        let (stop, stopped) = CancelToken::pair();

        let worker = Worker {
            transport,
            subject_prefix,
            stats: stats.clone(),
        };
        let worker = tokio::spawn(worker.run(receiver, stopped));

        info!(capacity, "Banner event publisher started");

        Self {
            sender,
            stats,
            stop,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn stats(&self) -> &PublisherStats {
        &self.stats
    }

    /// Stop accepting events, wait until every queued event has been handled
    /// and return the final counters. Later calls return immediately.
    pub async fn shutdown(&self) -> Arc<PublisherStats> {
        self.stop.cancel();
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Event publisher task failed");
            }
            info!(
                published = self.stats.published.load(Ordering::Relaxed),
                dropped = self.stats.dropped.load(Ordering::Relaxed),
                publish_errors = self.stats.publish_errors.load(Ordering::Relaxed),
                "Banner event publisher stopped"
            );
        }
        self.stats.clone()
    }
}

impl EventSink for QueuedPublisher {
    fn emit(&self, event: BannerEvent) {
        if let Err(e) = self.sender.try_send(event) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("events.dropped").increment(1);
            warn!("Banner event dropped: {}", e);
        } else {
            self.stats.queued.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("events.queued").increment(1);
        }
    }
}

struct Worker {
    transport: Arc<dyn EventTransport>,
    subject_prefix: String,
    stats: Arc<PublisherStats>,
}

impl Worker {
    async fn run(self, mut receiver: mpsc::Receiver<BannerEvent>, stopped: CancelToken) {
        let mut closing = false;
        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Some(event) => self.publish(event).await,
                    None => break,
                },
                _ = stopped.cancelled(), if !closing => {
                    // Buffered events are still delivered by `recv` after close.
                    receiver.close();
                    closing = true;
                }
            }
        }
        debug!("Event queue closed, publisher exiting");
    }

    async fn publish(&self, event: BannerEvent) {
        let subject = format!("{}.{}", self.subject_prefix, event.event_type.as_str());
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                self.failed();
                error!(error = %e, event_id = %event.event_id, "Failed to serialize banner event");
                return;
            }
        };

        match self.transport.publish(subject, payload).await {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("events.published").increment(1);
            }
            Err(e) => {
                self.failed();
                error!(error = %e, event_id = %event.event_id, "Failed to publish banner event");
            }
        }
    }

    fn failed(&self) {
        self.stats.publish_errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("events.publish_errors").increment(1);
    }
}
