//! Event bus: trait for emitting impression/click telemetry from any module.
//!
//! Handlers accept an `Arc<dyn EventSink>` and fire events without waiting on
//! the downstream stream (NATS in production).

use crate::types::{BannerEvent, EventType};
use parking_lot::Mutex;
use std::sync::Arc;

/// Fire-and-forget event sink. `emit` must not block the request path.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BannerEvent);
}

/// No-op sink for deployments without an event stream.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: BannerEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<BannerEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<BannerEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn count_type(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: BannerEvent) {
        self.events.lock().push(event);
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
