use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub verdict: VerdictConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Overrides `<data_dir>/cache/components.jsonl`
    #[serde(default)]
    pub path: Option<String>,
    /// Entries older than this are treated as misses. Absent = never expire.
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceKind {
    Heuristic,
    Static,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// used ≈ new × used_ratio when the source has no direct used price
    #[serde(default = "default_used_ratio")]
    pub used_ratio: f64,
    #[serde(default = "default_pricing_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_source")]
    pub source: PriceSourceKind,
    /// Normalized key → new price, used by the `static` source
    #[serde(default)]
    pub static_prices: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerdictConfig {
    #[serde(default = "default_margin_threshold")]
    pub margin_threshold: f64,
    #[serde(default = "default_true")]
    pub favor_unpriced: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reasoning_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config TOML")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config {:?} not found, using defaults", path.as_ref());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let ratio = self.pricing.used_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::UsedRatio(ratio));
        }
        let similarity = self.cache.similarity_threshold;
        if !(similarity > 0.0 && similarity <= 1.0) {
            return Err(ConfigError::SimilarityThreshold(similarity));
        }
        let threshold = self.verdict.margin_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::MarginThreshold(threshold));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::Concurrency);
        }
        if self.pricing.timeout_ms == 0 {
            return Err(ConfigError::Timeout { section: "pricing" });
        }
        if self.reasoning.timeout_ms == 0 {
            return Err(ConfigError::Timeout { section: "reasoning" });
        }
        Ok(())
    }

    pub fn cache_path(&self) -> PathBuf {
        match &self.cache.path {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.data_dir).join("cache").join("components.jsonl"),
        }
    }

    pub fn history_path(&self) -> PathBuf {
        Path::new(&self.data_dir)
            .join("history")
            .join("evaluations.jsonl")
    }

    pub fn cache_max_age(&self) -> Option<chrono::Duration> {
        self.cache
            .max_age_days
            .map(|days| chrono::Duration::days(i64::from(days)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache: CacheConfig::default(),
            pricing: PricingConfig::default(),
            verdict: VerdictConfig::default(),
            reasoning: ReasoningConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_age_days: None,
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            used_ratio: default_used_ratio(),
            timeout_ms: default_pricing_timeout_ms(),
            source: default_source(),
            static_prices: HashMap::new(),
        }
    }
}

impl PricingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            margin_threshold: default_margin_threshold(),
            favor_unpriced: true,
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_reasoning_timeout_ms(),
        }
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_similarity_threshold() -> f64 {
    0.92
}

fn default_used_ratio() -> f64 {
    0.65
}

fn default_pricing_timeout_ms() -> u64 {
    2000
}

fn default_source() -> PriceSourceKind {
    PriceSourceKind::Heuristic
}

fn default_margin_threshold() -> f64 {
    0.50
}

fn default_reasoning_timeout_ms() -> u64 {
    3000
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}
