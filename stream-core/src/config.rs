// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::collections::HashMap;

use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Parameter name supplied by the virtual-sensor lifecycle loader.
pub const BUFFER_SIZE_PARAM: &str = "buffer_size_in_days";

/// Reassembly engine configuration. The window width is the single tunable:
/// the grace period an incomplete epoch is buffered before being forced out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassemblyConfig {
    #[serde(default = "default_label")]
    pub label: String,
    pub buffer_size_days: i64,
}

fn default_label() -> String {
    "gps".to_string()
}

impl ReassemblyConfig {
    pub fn new(label: impl Into<String>, buffer_size_days: i64) -> Result<Self, ConfigError> {
        let config = Self {
            label: label.into(),
            buffer_size_days,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(config::Environment::with_prefix("GPS"))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from the raw init-parameter map handed over
    /// by the lifecycle loader. A missing or non-integer value is fatal.
    pub fn from_params(
        label: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let raw = params.get(BUFFER_SIZE_PARAM).ok_or_else(|| {
            ConfigError::Message(format!("{BUFFER_SIZE_PARAM} is required"))
        })?;
        let days: i64 = raw.trim().parse().map_err(|_| {
            ConfigError::Message(format!("{BUFFER_SIZE_PARAM} has to be an integer"))
        })?;
        Self::new(label, days)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size_days < 1 {
            return Err(ConfigError::Message(format!(
                "{BUFFER_SIZE_PARAM} must be at least 1, got {}",
                self.buffer_size_days
            )));
        }
        Ok(())
    }

    /// Window width `W` in milliseconds.
    pub fn window_ms(&self) -> i64 {
        self.buffer_size_days * MS_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(BUFFER_SIZE_PARAM.to_string(), value.to_string());
        map
    }

    #[test]
    fn parses_day_count() {
        let config = ReassemblyConfig::from_params("gps", &params("2")).unwrap();
        assert_eq!(config.buffer_size_days, 2);
        assert_eq!(config.window_ms(), 2 * MS_PER_DAY);
    }

    #[test]
    fn rejects_missing_parameter() {
        let err = ReassemblyConfig::from_params("gps", &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn rejects_non_integer() {
        assert!(ReassemblyConfig::from_params("gps", &params("1.5")).is_err());
        assert!(ReassemblyConfig::from_params("gps", &params("one")).is_err());
    }

    #[test]
    fn rejects_zero_days() {
        assert!(ReassemblyConfig::from_params("gps", &params("0")).is_err());
    }
}
