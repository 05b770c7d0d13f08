//! Storage capabilities the engine consumes. Any backend (in-memory, Redis,
//! a remote service) plugs in by implementing these.

use async_trait::async_trait;
use rotator_core::{BannerId, PerformanceRecord, RotatorResult, SegmentId, SlotId};

/// Maps a slot to the banners currently eligible for it.
#[async_trait]
pub trait SlotIndex: Send + Sync {
    /// Eligible banners in a stable order. Tie-breaking and cold-start
    /// behaviour depend on this order, so it must only change when slot
    /// membership does.
    async fn candidates_for(&self, slot: SlotId) -> RotatorResult<Vec<BannerId>>;
}

/// Per-(slot, banner, segment) impression and click counters.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Point lookup. A triple with no history yields the zero record.
    async fn get(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<PerformanceRecord>;

    /// Atomic create-at-1-or-increment of the impression counter.
    async fn record_impression(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<()>;

    /// Atomic create-at-1-or-increment of the click counter.
    async fn record_click(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<()>;
}
