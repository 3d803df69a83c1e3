use std::fs;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::market::MarketMode;

static CONFIG: OnceCell<WatchConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Explicit datacenter to scope lookups to. Wins over a volume-derived
    /// one, and the two must agree when both are set.
    #[serde(default)]
    pub datacenter_id: String,

    /// Network volume whose datacenter scopes the watch when no explicit
    /// datacenter_id is given.
    #[serde(default)]
    pub network_volume_id: String,

    #[serde(default)]
    pub market_mode: MarketMode,

    /// gpuTypeId values to watch, e.g. "NVIDIA GeForce RTX 5090".
    #[serde(default)]
    pub gpu_type_ids: Vec<String>,

    /// Pods of this many GPUs must be rentable for a row to count.
    #[serde(default = "default_gpu_count")]
    pub gpu_count: i64,

    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    /// Cooldown between periodic re-alerts while stock persists.
    #[serde(default = "default_pushover_cooldown")]
    pub pushover_cooldown_seconds: u64,

    /// Cooldown between change-triggered alerts.
    #[serde(default = "default_state_change_cooldown")]
    pub state_change_notify_cooldown_seconds: u64,

    #[serde(default)]
    pub enable_pushover: bool,

    /// true: alert once per unavailable-to-available flip.
    /// false: re-alert on the pushover cooldown while stock persists.
    #[serde(default = "default_true")]
    pub notify_on_availability_change_only: bool,

    /// Suppress the per-cycle console report unless the aggregate
    /// availability flipped.
    #[serde(default)]
    pub print_on_availability_change_only: bool,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    // File fallbacks for the matching environment variables. Env wins.
    #[serde(default)]
    pub runpod_api_key: String,
    #[serde(default)]
    pub pushover_app_token: String,
    #[serde(default)]
    pub pushover_user_key: String,
}

impl WatchConfig {
    const FILE_NAME: &'static str = "gpuwatch.yml";

    pub fn load() -> Result<&'static WatchConfig> {
        CONFIG.get_or_try_init(|| {
            let raw = fs::read_to_string(Self::FILE_NAME)
                .with_context(|| format!("failed to read watch config {}", Self::FILE_NAME))?;

            let config: WatchConfig = serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse watch config {}", Self::FILE_NAME))?;

            config
                .validate()
                .context("watch config validation failed")?;

            Ok(config)
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets().is_empty() {
            bail!("gpu_type_ids must name at least one GPU to watch");
        }
        if self.gpu_count < 1 {
            bail!("gpu_count must be >= 1");
        }
        if self.refresh_seconds < 1 {
            bail!("refresh_seconds must be >= 1");
        }
        if self.timeout_seconds < 1 {
            bail!("timeout_seconds must be >= 1");
        }
        Ok(())
    }

    /// Watched gpuTypeId values with blank entries dropped.
    pub fn targets(&self) -> Vec<String> {
        self.gpu_type_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn explicit_datacenter_id(&self) -> Option<&str> {
        let id = self.datacenter_id.trim();
        (!id.is_empty()).then_some(id)
    }

    pub fn volume_id(&self) -> Option<&str> {
        let id = self.network_volume_id.trim();
        (!id.is_empty()).then_some(id)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn periodic_cooldown(&self) -> Duration {
        Duration::from_secs(self.pushover_cooldown_seconds)
    }

    pub fn state_change_cooldown(&self) -> Duration {
        Duration::from_secs(self.state_change_notify_cooldown_seconds)
    }
}

fn default_gpu_count() -> i64 {
    1
}

fn default_refresh_seconds() -> u64 {
    10
}

fn default_pushover_cooldown() -> u64 {
    200
}

fn default_state_change_cooldown() -> u64 {
    30
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
