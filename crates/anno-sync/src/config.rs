//! Tuning knobs for reconciliation.

use anno_types::SyncError;
use serde::Deserialize;

const DEFAULT_MAX_CONCURRENCY: usize = 16;
const DEFAULT_NOTIFY_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on server objects classified at the same time.
    pub max_concurrency: usize,
    /// Batch notifications a slow store observer may lag behind.
    pub notify_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            notify_capacity: DEFAULT_NOTIFY_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Read ANNO_SYNC_MAX_CONCURRENCY and ANNO_SYNC_NOTIFY_CAPACITY, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, SyncError> {
        let defaults = Self::default();
        let config = Self {
            max_concurrency: read_env("ANNO_SYNC_MAX_CONCURRENCY", defaults.max_concurrency)?,
            notify_capacity: read_env("ANNO_SYNC_NOTIFY_CAPACITY", defaults.notify_capacity)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_concurrency == 0 {
            return Err(SyncError::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.notify_capacity == 0 {
            return Err(SyncError::Config("notify_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn read_env(name: &str, default: usize) -> Result<usize, SyncError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SyncError::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"max_concurrency": 4}"#).unwrap();
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.notify_capacity, DEFAULT_NOTIFY_CAPACITY);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = SyncConfig {
            max_concurrency: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
        assert!(SyncConfig::default().validate().is_ok());
    }
}
