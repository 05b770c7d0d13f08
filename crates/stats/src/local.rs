//! In-process performance counters backed by DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use rotator_bandit::StatsStore;
use rotator_core::{BannerId, PerformanceRecord, RotatorResult, SegmentId, SlotId};
use tracing::info;

type StatsKey = (SlotId, BannerId, SegmentId);

/// Lock-free per-(slot, banner, segment) counters.
/// Counters live only as long as the process.
pub struct MemoryStatsStore {
    records: DashMap<StatsKey, PerformanceRecord>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        info!("Stats store initialized (in-memory)");
        Self {
            records: DashMap::new(),
        }
    }

    /// Copy of every record, sorted by key.
    pub fn snapshot(&self) -> Vec<(StatsKey, PerformanceRecord)> {
        let mut rows: Vec<_> = self
            .records
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        rows.sort_by_key(|(key, _)| *key);
        rows
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStatsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn get(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<PerformanceRecord> {
        Ok(self
            .records
            .get(&(slot, banner, segment))
            .map(|r| *r.value())
            .unwrap_or_default())
    }

    async fn record_impression(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<()> {
        let mut record = self.records.entry((slot, banner, segment)).or_default();
        record.impressions = record.impressions.saturating_add(1);
        Ok(())
    }

    async fn record_click(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<()> {
        let mut record = self.records.entry((slot, banner, segment)).or_default();
        record.clicks = record.clicks.saturating_add(1);
        Ok(())
    }
}
