//! Epsilon-greedy banner selection.
//!
//! With probability `epsilon` a uniformly random candidate is shown
//! (explore); otherwise the candidate with the best Laplace-smoothed CTR
//! `clicks / (impressions + 1)` is shown (exploit). The first candidate in
//! slot order wins ties, so a slot with no history always starts with its
//! first banner.

use crate::collaborators::{SlotIndex, StatsStore};
use crate::error::{SelectionError, SelectionResult};
use crate::selector::BannerSelector;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rotator_core::{BannerId, CancelToken, SegmentId, SlotId};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Epsilon-greedy selector safe for concurrent use.
///
/// The random source is the only mutable state. Its lock is held for a
/// single draw at a time, never across collaborator I/O.
pub struct EpsilonGreedy {
    epsilon: f64,
    stats: Arc<dyn StatsStore>,
    slots: Arc<dyn SlotIndex>,
    rng: Mutex<StdRng>,
}

impl EpsilonGreedy {
    /// Build a selector whose random source is seeded from the clock.
    pub fn new(epsilon: f64, stats: Arc<dyn StatsStore>, slots: Arc<dyn SlotIndex>) -> Self {
        Self::with_rng(epsilon, stats, slots, StdRng::seed_from_u64(clock_seed()))
    }

    /// Build a selector around an existing random source (deterministic tests).
    pub fn with_rng(
        epsilon: f64,
        stats: Arc<dyn StatsStore>,
        slots: Arc<dyn SlotIndex>,
        rng: StdRng,
    ) -> Self {
        Self {
            epsilon,
            stats,
            slots,
            rng: Mutex::new(rng),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn draw_unit(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }

    fn draw_index(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len)
    }

    async fn exploit(
        &self,
        slot: SlotId,
        segment: SegmentId,
        candidates: &[BannerId],
        cancel: &CancelToken,
    ) -> SelectionResult<BannerId> {
        let mut leader = Leader::default();

        for &candidate in candidates {
            if cancel.is_cancelled() {
                return Err(SelectionError::Cancelled);
            }
            let record = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SelectionError::Cancelled),
                record = self.stats.get(slot, candidate, segment) => {
                    record.map_err(SelectionError::Lookup)?
                }
            };
            leader.offer(candidate, record.smoothed_ctr());
        }

        leader.best().ok_or(SelectionError::NoCandidates { slot })
    }

    async fn decide(
        &self,
        slot: SlotId,
        segment: SegmentId,
        cancel: &CancelToken,
    ) -> SelectionResult<BannerId> {
        let candidates = self
            .slots
            .candidates_for(slot)
            .await
            .map_err(SelectionError::Lookup)?;

        if candidates.is_empty() {
            return Err(SelectionError::NoCandidates { slot });
        }

        let chosen = if self.draw_unit() < self.epsilon {
            metrics::counter!("selection.explore").increment(1);
            candidates[self.draw_index(candidates.len())]
        } else {
            metrics::counter!("selection.exploit").increment(1);
            self.exploit(slot, segment, &candidates, cancel).await?
        };

        self.stats
            .record_impression(slot, chosen, segment)
            .await
            .map_err(SelectionError::Accounting)?;

        debug!(
            slot = %slot,
            segment = %segment,
            banner = %chosen,
            candidates = candidates.len(),
            "Banner selected"
        );
        Ok(chosen)
    }
}

#[async_trait]
impl BannerSelector for EpsilonGreedy {
    async fn select_with_cancel(
        &self,
        slot: SlotId,
        segment: SegmentId,
        cancel: &CancelToken,
    ) -> SelectionResult<BannerId> {
        metrics::counter!("selection.requests").increment(1);
        let result = self.decide(slot, segment, cancel).await;
        if let Err(e) = &result {
            metrics::counter!("selection.errors", "kind" => e.kind()).increment(1);
        }
        result
    }

    async fn record_click(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> SelectionResult<()> {
        self.stats
            .record_click(slot, banner, segment)
            .await
            .map_err(SelectionError::Accounting)?;
        metrics::counter!("selection.clicks").increment(1);
        Ok(())
    }
}

/// Running arg-max where the earliest offer keeps the lead on ties.
#[derive(Debug, Default)]
struct Leader {
    best: Option<(BannerId, f64)>,
}

impl Leader {
    fn offer(&mut self, banner: BannerId, rate: f64) {
        match self.best {
            Some((_, best_rate)) if rate <= best_rate => {}
            _ => self.best = Some((banner, rate)),
        }
    }

    fn best(&self) -> Option<BannerId> {
        self.best.map(|(banner, _)| banner)
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
