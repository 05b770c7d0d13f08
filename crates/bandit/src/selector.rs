//! The capability request handlers depend on, plus the factory that builds
//! the configured selector.

use crate::collaborators::{SlotIndex, StatsStore};
use crate::epsilon_greedy::EpsilonGreedy;
use crate::error::SelectionResult;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rotator_core::config::BanditConfig;
use rotator_core::{BannerId, CancelToken, SegmentId, SlotId};
use std::sync::Arc;
use tracing::info;

/// Chooses a banner for a slot and keeps the click/impression accounting
/// for the choices it makes.
#[async_trait]
pub trait BannerSelector: Send + Sync {
    /// Pick a banner and record its impression. An `Ok` result means the
    /// impression was recorded.
    async fn select(&self, slot: SlotId, segment: SegmentId) -> SelectionResult<BannerId> {
        self.select_with_cancel(slot, segment, &CancelToken::never())
            .await
    }

    /// Same as [`select`](Self::select), aborting with
    /// [`SelectionError::Cancelled`](crate::SelectionError::Cancelled) once
    /// `cancel` fires while statistics are being scanned.
    async fn select_with_cancel(
        &self,
        slot: SlotId,
        segment: SegmentId,
        cancel: &CancelToken,
    ) -> SelectionResult<BannerId>;

    async fn record_click(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> SelectionResult<()>;
}

/// Build the epsilon-greedy selector described by `config`.
pub fn new_bandit(
    config: &BanditConfig,
    stats: Arc<dyn StatsStore>,
    slots: Arc<dyn SlotIndex>,
) -> Arc<dyn BannerSelector> {
    let engine = match config.seed {
        Some(seed) => {
            info!(epsilon = config.epsilon, seed, "Epsilon-greedy selector with fixed seed");
            EpsilonGreedy::with_rng(config.epsilon, stats, slots, StdRng::seed_from_u64(seed))
        }
        None => {
            info!(epsilon = config.epsilon, "Epsilon-greedy selector");
            EpsilonGreedy::new(config.epsilon, stats, slots)
        }
    };
    Arc::new(engine)
}
