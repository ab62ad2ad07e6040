//! Controller settings loaded from environment variables.

use crate::error::ControllerError;
use std::env;
use std::time::Duration;

/// Default name of the companion ConfigMap carrying the hosts file.
pub const DEFAULT_COMMON_CONFIG_NAME: &str = "common-config";

/// Process-wide settings. Read once at start-up and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Name of the companion ConfigMap looked up in the agent's namespace
    pub common_config_name: String,
    /// Delay before re-checking a DaemonSet that was just updated
    pub requeue_after: Duration,
    /// First retry delay after a failed reconciliation
    pub error_backoff_min: Duration,
    /// Upper bound of the retry delay
    pub error_backoff_max: Duration,
    /// Maximum number of concurrent reconciliations
    pub concurrency: u16,
    /// Quiet period after the last event before reconciling
    pub debounce: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: None,
            common_config_name: DEFAULT_COMMON_CONFIG_NAME.to_string(),
            requeue_after: Duration::from_secs(10),
            error_backoff_min: Duration::from_secs(5),
            error_backoff_max: Duration::from_secs(300),
            concurrency: 3,
            debounce: Duration::from_secs(1),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        let common_config_name = lookup("COMMON_CONFIG_NAME")
            .filter(|name| !name.is_empty())
            .unwrap_or(defaults.common_config_name);

        let requeue_after = seconds(&lookup, "REQUEUE_AFTER_SECONDS", defaults.requeue_after)?;
        let error_backoff_min = seconds(&lookup, "ERROR_BACKOFF_MIN_SECONDS", defaults.error_backoff_min)?;
        let error_backoff_max = seconds(&lookup, "ERROR_BACKOFF_MAX_SECONDS", defaults.error_backoff_max)?;
        let debounce = seconds(&lookup, "RECONCILE_DEBOUNCE_SECONDS", defaults.debounce)?;
        let concurrency = match lookup("RECONCILE_CONCURRENCY") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ControllerError::InvalidConfig(format!("RECONCILE_CONCURRENCY={raw}: {e}"))
            })?,
            None => defaults.concurrency,
        };

        if requeue_after.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "REQUEUE_AFTER_SECONDS must be greater than zero".to_string(),
            ));
        }
        if error_backoff_min > error_backoff_max {
            return Err(ControllerError::InvalidConfig(format!(
                "ERROR_BACKOFF_MIN_SECONDS ({}) exceeds ERROR_BACKOFF_MAX_SECONDS ({})",
                error_backoff_min.as_secs(),
                error_backoff_max.as_secs()
            )));
        }

        Ok(Self {
            namespace,
            common_config_name,
            requeue_after,
            error_backoff_min,
            error_backoff_max,
            concurrency,
            debounce,
        })
    }
}

fn seconds<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ControllerError::InvalidConfig(format!("{key}={raw}: {e}"))),
        None => Ok(default),
    }
}
