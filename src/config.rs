//! Layered configuration for the capture pipeline.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`REPO_CAPTURE_*`, `__` separates sections)
//! 2. `repo-capture.toml` in the working directory
//! 3. Built-in defaults
//!
//! `REPO_CAPTURE_ROUTING__AUTO_COMMIT=0.85` maps to `routing.auto_commit`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "repo-capture.toml";
pub const ENV_PREFIX: &str = "REPO_CAPTURE_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub routing: RoutingThresholds,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Confidence bands for the router. Both bounds are inclusive on the upper
/// side: `confidence >= auto_commit` auto-commits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingThresholds {
    pub auto_commit: f32,
    pub soft_confirm: f32,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            auto_commit: 0.80,
            soft_confirm: 0.50,
        }
    }
}

/// All durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_ms: u64,
    pub debounce_quiet_ms: u64,
    pub soft_fade_ms: u64,
    pub auto_save_ms: u64,
    pub confirmed_display_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            debounce_quiet_ms: 1500,
            soft_fade_ms: 5000,
            auto_save_ms: 3000,
            confirmed_display_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn debounce_quiet(&self) -> Duration {
        Duration::from_millis(self.debounce_quiet_ms)
    }

    pub fn soft_fade(&self) -> Duration {
        Duration::from_millis(self.soft_fade_ms)
    }

    pub fn auto_save(&self) -> Duration {
        Duration::from_millis(self.auto_save_ms)
    }

    pub fn confirmed_display(&self) -> Duration {
        Duration::from_millis(self.confirmed_display_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// llama-server style endpoint; requests go to `<base_url>/completion`.
    pub base_url: String,
    pub timeout_ms: u64,
    pub default_confidence: f32,
    /// Fragments shorter than this (in chars) never reach the backend.
    pub min_fragment_chars: usize,
    pub n_predict: usize,
    pub temperature: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 2000,
            default_confidence: 0.7,
            min_fragment_chars: 5,
            n_predict: 512,
            temperature: 0.1,
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub sqlite_path: PathBuf,
    /// Semantic store base URL. Unset means notes stay in process memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_api_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("repo.db"),
            semantic_url: None,
            semantic_api_key: None,
        }
    }
}

impl PipelineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment(Path::new(CONFIG_FILE)).extract().map_err(ConfigError::from)
    }

    /// Provider chain: defaults <- TOML file (if present) <- env.
    pub fn figment(toml_path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if toml_path.exists() {
            figment = figment.merge(Toml::file(toml_path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
