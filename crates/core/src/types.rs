use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Placement on a page where one banner is shown at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub i64);

/// A creative. The selection engine treats it as an opaque arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BannerId(pub i64);

/// Audience group that scopes statistics independently per audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub i64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregated impression/click counters for one (slot, banner, segment).
///
/// `clicks` may exceed `impressions` when writers outside the engine race
/// each other; nothing here asserts an ordering between the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub impressions: u64,
    pub clicks: u64,
}

impl PerformanceRecord {
    pub fn new(impressions: u64, clicks: u64) -> Self {
        Self {
            impressions,
            clicks,
        }
    }

    /// Laplace-smoothed click-through rate, `clicks / (impressions + 1)`.
    /// An arm with no history scores exactly `0.0`.
    pub fn smoothed_ctr(&self) -> f64 {
        self.clicks as f64 / (self.impressions as f64 + 1.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Impression,
    Click,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Impression => "impression",
            EventType::Click => "click",
        }
    }
}

/// Telemetry record published to the event stream after a show or click.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub segment_id: SegmentId,
    pub timestamp: DateTime<Utc>,
}

impl BannerEvent {
    pub fn new(
        event_type: EventType,
        slot_id: SlotId,
        banner_id: BannerId,
        segment_id: SegmentId,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            slot_id,
            banner_id,
            segment_id,
            timestamp: Utc::now(),
        }
    }

    pub fn impression(slot_id: SlotId, banner_id: BannerId, segment_id: SegmentId) -> Self {
        Self::new(EventType::Impression, slot_id, banner_id, segment_id)
    }

    pub fn click(slot_id: SlotId, banner_id: BannerId, segment_id: SegmentId) -> Self {
        Self::new(EventType::Click, slot_id, banner_id, segment_id)
    }
}
