#![warn(clippy::unwrap_used)]

pub mod client;
pub mod local;

pub use client::RedisStatsStore;
pub use local::MemoryStatsStore;

use rotator_bandit::StatsStore;
use rotator_core::config::{AppConfig, StatsBackend};
use std::sync::Arc;

/// Build the stats backend selected by `stats.backend`.
pub async fn build_stats_store(config: &AppConfig) -> anyhow::Result<Arc<dyn StatsStore>> {
    let store: Arc<dyn StatsStore> = match config.stats.backend {
        StatsBackend::Memory => Arc::new(MemoryStatsStore::new()),
        StatsBackend::Redis => Arc::new(RedisStatsStore::new(&config.redis).await?),
    };
    Ok(store)
}
