#![warn(clippy::unwrap_used)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod types;

pub use cancel::{CancelHandle, CancelToken};
pub use config::AppConfig;
pub use error::{RotatorError, RotatorResult};
pub use types::{BannerId, PerformanceRecord, SegmentId, SlotId};
