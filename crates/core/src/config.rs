use serde::Deserialize;

/// Root application configuration. Loaded from an optional `config/rotator`
/// file and then from environment variables with the prefix
/// `BANNER_ROTATOR__` (environment wins).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub bandit: BanditConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Requests running longer than this are answered with 408.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Epsilon-greedy parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BanditConfig {
    /// Exploration probability. Values outside `[0, 1]` are not rejected:
    /// below zero always exploits, above one always explores.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Fixed seed for the shared random source. Unset seeds from the clock.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub backend: StatsBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_nats_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_nats_max_reconnects")]
    pub max_reconnects: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "rotator-01".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_epsilon() -> f64 {
    0.1
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_key_prefix() -> String {
    "rotator".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_nats_urls() -> Vec<String> {
    vec!["nats://localhost:4222".to_string()]
}
fn default_subject_prefix() -> String {
    "banner-events".to_string()
}
fn default_nats_max_reconnects() -> usize {
    60
}
fn default_queue_capacity() -> usize {
    10_000
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            seed: None,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            key_prefix: default_key_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            urls: default_nats_urls(),
            subject_prefix: default_subject_prefix(),
            max_reconnects: default_nats_max_reconnects(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            log_level: default_log_level(),
            api: ApiConfig::default(),
            bandit: BanditConfig::default(),
            stats: StatsConfig::default(),
            redis: RedisConfig::default(),
            nats: NatsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the optional config file and environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/rotator").required(false))
            .add_source(
                config::Environment::with_prefix("BANNER_ROTATOR")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redis.urls")
                    .with_list_parse_key("nats.urls"),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn from_toml(raw: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.api.request_timeout_ms, 10_000);
        assert_eq!(config.bandit.epsilon, 0.1);
        assert_eq!(config.bandit.seed, None);
        assert_eq!(config.stats.backend, StatsBackend::Memory);
        assert!(!config.nats.enabled);
        assert_eq!(config.nats.subject_prefix, "banner-events");
    }

    #[test]
    fn test_empty_source_falls_back_to_defaults() {
        let config = from_toml("");
        assert_eq!(config.node_id, "rotator-01");
        assert_eq!(config.metrics.port, 9091);
        assert_eq!(config.redis.urls, vec!["redis://localhost:6379".to_string()]);
    }

    #[test]
    fn test_partial_override() {
        let config = from_toml(
            r#"
            log_level = "debug"

            [api]
            request_timeout_ms = 2500

            [bandit]
            epsilon = 0.25
            seed = 17

            [stats]
            backend = "redis"

            [nats]
            enabled = true
            "#,
        );
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bandit.epsilon, 0.25);
        assert_eq!(config.bandit.seed, Some(17));
        assert_eq!(config.stats.backend, StatsBackend::Redis);
        assert!(config.nats.enabled);
        assert_eq!(config.nats.queue_capacity, 10_000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.api.request_timeout_ms, 2500);
    }
}
