//! Redis-backed performance counters shared across rotator nodes.
//! One hash per (slot, banner, segment) with `impressions` and `clicks` fields.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use rotator_bandit::StatsStore;
use rotator_core::config::RedisConfig;
use rotator_core::{BannerId, PerformanceRecord, RotatorError, RotatorResult, SegmentId, SlotId};
use std::time::Duration;
use tracing::{debug, info};

const IMPRESSIONS: &str = "impressions";
const CLICKS: &str = "clicks";

pub struct RedisStatsStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisStatsStore {
    /// Connect to the first configured Redis URL and verify it with PING.
    pub async fn new(config: &RedisConfig) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis stats backend");

        let client = redis::Client::open(url.as_str())?;
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out connecting to Redis at {url}"))??;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "Redis connection established");

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, slot: SlotId, banner: BannerId, segment: SegmentId) -> String {
        stats_key(&self.key_prefix, slot, banner, segment)
    }

    async fn increment(&self, key: String, field: &str) -> RotatorResult<()> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.hincr(&key, field, 1).await.map_err(storage)?;
        debug!(key = %key, field, value, "Stats counter incremented");
        Ok(())
    }
}

pub(crate) fn stats_key(
    prefix: &str,
    slot: SlotId,
    banner: BannerId,
    segment: SegmentId,
) -> String {
    format!("{prefix}:stats:{slot}:{banner}:{segment}")
}

/// Decode an `HMGET key impressions clicks` reply. Missing fields, including
/// a missing hash, read as zero.
pub(crate) fn decode_record(reply: &redis::Value) -> RotatorResult<PerformanceRecord> {
    let (impressions, clicks): (Option<u64>, Option<u64>) =
        redis::FromRedisValue::from_redis_value(reply).map_err(storage)?;
    Ok(PerformanceRecord::new(
        impressions.unwrap_or(0),
        clicks.unwrap_or(0),
    ))
}

fn storage(e: redis::RedisError) -> RotatorError {
    metrics::counter!("stats.redis_errors").increment(1);
    RotatorError::Storage(e.to_string())
}

#[async_trait]
impl StatsStore for RedisStatsStore {
    async fn get(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<PerformanceRecord> {
        let mut conn = self.conn.clone();
        let reply: redis::Value = redis::cmd("HMGET")
            .arg(self.key(slot, banner, segment))
            .arg(IMPRESSIONS)
            .arg(CLICKS)
            .query_async(&mut conn)
            .await
            .map_err(storage)?;

        decode_record(&reply)
    }

    async fn record_impression(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<()> {
        self.increment(self.key(slot, banner, segment), IMPRESSIONS).await
    }

    async fn record_click(
        &self,
        slot: SlotId,
        banner: BannerId,
        segment: SegmentId,
    ) -> RotatorResult<()> {
        self.increment(self.key(slot, banner, segment), CLICKS).await
    }
}
