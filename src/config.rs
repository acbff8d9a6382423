//! Runtime configuration for the relay process.

use std::path::PathBuf;
use std::time::Duration;

use crate::delivery::retry::RetryPolicy;
use crate::delivery::transport::DeviceId;
use crate::error::ConfigError;

/// Process-level settings, read from the environment.
///
/// Filter rules are not here: they live in the settings store and are
/// reloaded while running.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// JSON settings file watched for changes.
    pub settings_path: PathBuf,
    /// How often the settings file is checked for changes.
    pub poll_interval: Duration,
    /// Device messages are delivered to.
    pub device: DeviceId,
    /// Retry policy for nacked messages.
    pub retry: RetryPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("./data/settings.json"),
            poll_interval: Duration::from_secs(2),
            device: DeviceId::new("default"),
            retry: RetryPolicy::default(),
        }
    }
}

impl RelayConfig {
    /// Read overrides from `RELAY_*` environment variables.
    ///
    /// `RELAY_RETRY_MAX_ATTEMPTS=0` means retry forever.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let settings_path = std::env::var("RELAY_SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.settings_path);

        let poll_interval = env_parse::<u64>("RELAY_POLL_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let device = std::env::var("RELAY_DEVICE_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(DeviceId::new)
            .unwrap_or(defaults.device);

        let mut retry = defaults.retry;
        if let Some(max) = env_parse::<u32>("RELAY_RETRY_MAX_ATTEMPTS") {
            retry.max_attempts = (max > 0).then_some(max);
        }
        if let Some(ms) = env_parse::<u64>("RELAY_RETRY_BASE_DELAY_MS") {
            retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("RELAY_RETRY_MAX_DELAY_MS") {
            retry.max_delay = Duration::from_millis(ms);
        }

        Self {
            settings_path,
            poll_interval,
            device,
            retry,
        }
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_POLL_INTERVAL_SECS".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_RETRY_MAX_DELAY_MS".into(),
                message: format!(
                    "{}ms is below the base delay of {}ms",
                    self.retry.max_delay.as_millis(),
                    self.retry.base_delay.as_millis()
                ),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
