//! CLI configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use lexigraph_core::limits::{
    validate_depth, validate_threshold, DEFAULT_LINE_BUDGET, DEFAULT_MAX_DEPTH,
    DEFAULT_SIMILARITY_THRESHOLD,
};

use crate::output::OutputFormat;

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lexigraph")
        .join("config.toml")
}

/// Config file in use: the explicit override, else the default location
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Answer lines per question
    pub default_budget: usize,
    /// Minimum percent similarity for "did you mean" candidates
    pub similarity_threshold: u32,
    /// Recursion guard for queries
    pub max_depth: usize,
    pub output_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_budget: DEFAULT_LINE_BUDGET,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_depth: DEFAULT_MAX_DEPTH,
            output_format: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &[
            "default_budget",
            "similarity_threshold",
            "max_depth",
            "output_format",
        ]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "default_budget" => Some(self.default_budget.to_string()),
            "similarity_threshold" => Some(self.similarity_threshold.to_string()),
            "max_depth" => Some(self.max_depth.to_string()),
            "output_format" => Some(self.output_format.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "default_budget" => {
                self.default_budget = value
                    .parse()
                    .with_context(|| format!("default_budget must be a number, got {:?}", value))?;
            }
            "similarity_threshold" => {
                let threshold: u32 = value.parse().with_context(|| {
                    format!("similarity_threshold must be a number, got {:?}", value)
                })?;
                validate_threshold(threshold)?;
                self.similarity_threshold = threshold;
            }
            "max_depth" => {
                let depth: usize = value
                    .parse()
                    .with_context(|| format!("max_depth must be a number, got {:?}", value))?;
                validate_depth(depth)?;
                self.max_depth = depth;
            }
            "output_format" => {
                self.output_format = value.parse()?;
            }
            _ => anyhow::bail!(
                "Unknown config key: {}. Available keys: {}",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        validate_threshold(self.similarity_threshold)?;
        validate_depth(self.max_depth)?;
        Ok(())
    }
}
