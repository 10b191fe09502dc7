use engine_core::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::sync::Semaphore;
use tracing::info;

pub mod error;
pub mod overrides;

use error::ConfigError;
use overrides::SettingsOverrides;

/// Engine configuration. Every key is optional in the TOML file.
///
/// ```toml
/// chunk_size = 100
/// grid_size = 4
/// per_chunk_timeout = "30s"
///
/// [retry]
/// max_attempts = 3
/// base_delay = "100ms"
/// multiplier = 2.0
/// max_delay = "30s"
///
/// [sink]
/// kind = "sled"
/// path = "/var/lib/bulkhead/records"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Records per chunk (one transaction each).
    pub chunk_size: usize,
    /// Target partition count, also the worker concurrency limit.
    pub grid_size: usize,
    pub retry: RetrySettings,
    /// Upper bound for a single transform+write attempt. None disables it.
    #[serde(with = "humantime_serde")]
    pub per_chunk_timeout: Option<Duration>,
    pub sink: SinkSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: usize,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    pub multiplier: f64,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkSettings {
    #[default]
    Memory,
    Sled {
        path: PathBuf,
    },
    Postgres {
        url: String,
    },
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            grid_size: 4,
            retry: RetrySettings::default(),
            per_chunk_timeout: None,
            sink: SinkSettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay: policy.base_delay,
            multiplier: policy.multiplier,
            max_delay: policy.max_delay,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.base_delay,
            self.multiplier,
            self.max_delay,
        )
    }
}

impl EngineSettings {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Defaults, then the optional file, then `overrides`; validated.
    pub fn load(
        path: Option<&Path>,
        overrides: SettingsOverrides,
    ) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => {
                info!(path = %path.display(), "Loading engine settings");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        overrides.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be at least 1"));
        }
        if self.grid_size == 0 {
            return Err(invalid("grid_size", "must be at least 1"));
        }
        if self.grid_size > Semaphore::MAX_PERMITS {
            return Err(invalid(
                "grid_size",
                format!("must not exceed {}", Semaphore::MAX_PERMITS),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(invalid(
                "retry.multiplier",
                format!("must be a finite value >= 1.0, got {}", self.retry.multiplier),
            ));
        }
        if !self.retry.max_delay.is_zero() && self.retry.max_delay < self.retry.base_delay {
            return Err(invalid(
                "retry.max_delay",
                "must not be smaller than retry.base_delay",
            ));
        }
        if self.per_chunk_timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid("per_chunk_timeout", "must be greater than zero"));
        }
        if let SinkSettings::Postgres { url } = &self.sink
            && url.trim().is_empty()
        {
            return Err(invalid("sink.url", "must not be empty"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
