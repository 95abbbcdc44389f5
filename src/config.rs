use serde::{Deserialize, Serialize};

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    /// Absent key disables extraction/matching; validated before any write.
    pub api_key: Option<String>,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

/// The bearer token must never reach the logs; startup Debug-prints the
/// whole config.
impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("max_retries", &self.max_retries)
            .field("retry_base_ms", &self.retry_base_ms)
            .finish()
    }
}

/// Throttling knobs for the quote pricing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub clean_chunk_size: usize,
    pub chunk_pause_ms: u64,
    /// 4s before every market lookup keeps us under ~15 requests/minute.
    pub market_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/santier".to_string()),
            },
            ai: AiConfig {
                base_url: std::env::var("AI_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8091".to_string()),
                api_key: std::env::var("AI_API_KEY").ok(),
                max_retries: env_parse("AI_MAX_RETRIES", 3),
                retry_base_ms: env_parse("AI_RETRY_BASE_MS", 2000),
            },
            pricing: PricingConfig {
                clean_chunk_size: env_parse("PRICING_CLEAN_CHUNK_SIZE", 20),
                chunk_pause_ms: env_parse("PRICING_CHUNK_PAUSE_MS", 1000),
                market_delay_ms: env_parse("PRICING_MARKET_DELAY_MS", 4000),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
