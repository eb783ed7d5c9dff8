use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use places::kakao::KAKAO_BASE_URL;
use tracing::{info, warn};

use crate::{error::ConfigError, geoip::GEOIP_URL, roulette::RouletteConfig};

pub struct Config {
    pub port: u16,
    pub kakao_rest_key: String,
    pub kakao_base_url: String,
    pub geoip_url: String,
    pub search_timeout: Duration,
    pub roulette: RouletteConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| env::var(key).ok())
    }

    pub fn load_with(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = RouletteConfig::default();

        let roulette = RouletteConfig {
            min_steps: try_load(&var, "ROULETTE_MIN_STEPS", &defaults.min_steps.to_string())?,
            max_steps: try_load(&var, "ROULETTE_MAX_STEPS", &defaults.max_steps.to_string())?,
            base_interval: millis(try_load(
                &var,
                "ROULETTE_BASE_INTERVAL_MS",
                &defaults.base_interval.as_millis().to_string(),
            )?),
            interval_step: millis(try_load(
                &var,
                "ROULETTE_INTERVAL_STEP_MS",
                &defaults.interval_step.as_millis().to_string(),
            )?),
            tail_steps: try_load(&var, "ROULETTE_TAIL_STEPS", &defaults.tail_steps.to_string())?,
            settle_delay: millis(try_load(
                &var,
                "ROULETTE_SETTLE_MS",
                &defaults.settle_delay.as_millis().to_string(),
            )?),
        };

        Ok(Self {
            port: try_load(&var, "RUST_PORT", "1111")?,
            kakao_rest_key: read_secret(&var, "KAKAO_REST_KEY")?,
            kakao_base_url: try_load(&var, "KAKAO_BASE_URL", KAKAO_BASE_URL)?,
            geoip_url: try_load(&var, "GEOIP_URL", GEOIP_URL)?,
            search_timeout: millis(try_load(&var, "SEARCH_TIMEOUT_MS", "5000")?),
            roulette: roulette.normalized(),
        })
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn try_load<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

/// Docker secret first, then an environment variable of the same name.
fn read_secret(var: &impl Fn(&str) -> Option<String>, secret_name: &str) -> Result<String, ConfigError> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .or_else(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
            var(secret_name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfigError::MissingSecret(secret_name.to_string()))
        })
}
