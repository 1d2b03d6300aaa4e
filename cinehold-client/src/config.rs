use crate::channel::ReconnectPolicy;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub services: ServicesConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub seat_lock_base_url: String,
    pub booking_base_url: String,
    pub promotion_base_url: String,
    pub payment_base_url: String,
    /// WebSocket endpoint the per-showtime push channel attaches to
    pub push_endpoint: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub default_hold_seconds: u64,
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_max_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_reconnect_attempts() -> u32 { 5 }
fn default_reconnect_delay_ms() -> u64 { 2_000 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `CINEHOLD__BUSINESS_RULES__DEFAULT_HOLD_SECONDS=300`
            .add_source(config::Environment::with_prefix("CINEHOLD").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.business_rules.reconnect_max_attempts,
            delay: Duration::from_millis(self.business_rules.reconnect_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.services.request_timeout_ms)
    }
}
