//! Configuration Management
//!
//! Provider-level settings for gce-igm: where resources live by default,
//! which API endpoint to talk to, and how long to wait for it.

use crate::compute::operation::DEFAULT_POLL_INTERVAL;
use crate::error::{Error, Result};
use crate::gcp::client::DEFAULT_ENDPOINT;
use crate::igm::{ProviderDefaults, RetryPolicy, Timeouts};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 900;

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

/// Per-operation timeouts in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_timeout")]
    pub create: u64,
    #[serde(default = "default_timeout")]
    pub update: u64,
    #[serde(default = "default_timeout")]
    pub delete: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT_SECS,
            update: DEFAULT_TIMEOUT_SECS,
            delete: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Retry of the delete request on transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteRetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for DeleteRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_retries,
            delay_secs: policy.delay.as_secs(),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Default project for resources that don't name one
    #[serde(default)]
    pub project: Option<String>,
    /// Default zone for resources that don't name one
    #[serde(default)]
    pub zone: Option<String>,
    /// Region searched when a resource has no zone
    #[serde(default)]
    pub region: Option<String>,
    /// Compute API root
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Seconds between operation polls
    #[serde(default = "default_poll_interval")]
    pub operation_poll_interval: u64,
    #[serde(default)]
    pub delete_retry: DeleteRetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            project: None,
            zone: None,
            region: None,
            endpoint: default_endpoint(),
            timeouts: TimeoutsConfig::default(),
            operation_poll_interval: default_poll_interval(),
            delete_retry: DeleteRetryConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gce-igm").join("config.json"))
    }

    /// Load configuration from the default location; a missing file means
    /// defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| Error::io(path, e))
    }

    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.endpoint).is_err() {
            return Err(Error::InvalidConfig(format!(
                "endpoint {:?} is not a valid URL",
                self.endpoint
            )));
        }
        if self.operation_poll_interval == 0 {
            return Err(Error::InvalidConfig(
                "operation_poll_interval must be at least 1 second".into(),
            ));
        }
        Ok(())
    }

    /// Get effective project (config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective zone (config > gcloud default)
    pub fn effective_zone(&self) -> Option<String> {
        self.zone
            .clone()
            .filter(|z| !z.is_empty())
            .or_else(crate::gcp::auth::get_default_zone)
    }

    /// Get effective region (config > gcloud default). The zone's region is
    /// applied later by [`ProviderDefaults::effective_region`].
    pub fn effective_region(&self) -> Option<String> {
        self.region
            .clone()
            .filter(|r| !r.is_empty())
            .or_else(crate::gcp::auth::get_default_region)
    }

    pub fn provider_defaults(&self) -> ProviderDefaults {
        ProviderDefaults {
            project: self.effective_project(),
            zone: self.effective_zone(),
            region: self.effective_region(),
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(self.timeouts.create),
            update: Duration::from_secs(self.timeouts.update),
            delete: Duration::from_secs(self.timeouts.delete),
        }
    }

    pub fn delete_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.delete_retry.max_attempts,
            delay: Duration::from_secs(self.delete_retry.delay_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.operation_poll_interval)
    }
}
