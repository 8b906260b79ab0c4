//! Configuration module
//!
//! Run settings with defaults, overridable from a config file, `ROSESPEC_*`
//! environment variables and the command line, in that order.

mod env;
mod file;

pub use env::{EnvBuilder, EnvConfig, EnvGuard};
pub use file::{expand_path, CONFIG_LOCATIONS};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::executor::{default_parallelism, DEFAULT_CONCURRENCY};
use crate::output::OutputFormat;
use crate::utils::logger::LogLevel;

/// Which runner executes the selected tests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    Sequential,
    #[default]
    Concurrent,
    Parallel,
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerKind::Sequential => write!(f, "sequential"),
            RunnerKind::Concurrent => write!(f, "concurrent"),
            RunnerKind::Parallel => write!(f, "parallel"),
        }
    }
}

impl std::str::FromStr for RunnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// Run configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub runner: RunnerKind,

    /// Tests running at once in one process
    pub concurrency: usize,

    /// Worker processes for the parallel runner
    pub parallelism: usize,

    /// Tests running at once inside each worker
    pub child_concurrency: usize,

    /// Timeout for tests that set none; 0 disables it
    pub default_timeout_ms: u64,

    /// Kill a worker that stays silent this long
    pub worker_idle_timeout_secs: Option<u64>,

    /// Output format (table, json, json-pretty, summary)
    pub format: String,

    pub log_level: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            runner: RunnerKind::default(),
            concurrency: DEFAULT_CONCURRENCY,
            parallelism: default_parallelism(),
            child_concurrency: DEFAULT_CONCURRENCY,
            default_timeout_ms: crate::DEFAULT_TIMEOUT.as_millis() as u64,
            worker_idle_timeout_secs: None,
            format: "table".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a YAML or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if file::is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from the first standard location that exists, or use defaults
    pub fn load_default() -> Result<Self> {
        match file::find() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if file::is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.parallelism == 0 {
            anyhow::bail!("parallelism must be at least 1");
        }
        if self.child_concurrency == 0 {
            anyhow::bail!("child_concurrency must be at least 1");
        }
        self.output_format()?;
        self.log_level()?;
        Ok(())
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(runner) = env.runner {
            self.runner = runner;
        }
        if let Some(concurrency) = env.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(parallelism) = env.parallelism {
            self.parallelism = parallelism;
        }
        if let Some(child_concurrency) = env.child_concurrency {
            self.child_concurrency = child_concurrency;
        }
        if let Some(timeout) = env.timeout_ms {
            self.default_timeout_ms = timeout;
        }
        if let Some(idle) = env.worker_idle_timeout_secs {
            self.worker_idle_timeout_secs = Some(idle);
        }
        if let Some(format) = &env.format {
            self.format = format.clone();
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn worker_idle_timeout(&self) -> Option<Duration> {
        self.worker_idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format
            .parse()
            .map_err(|err: String| anyhow::anyhow!(err))
    }

    pub fn log_level(&self) -> Result<LogLevel> {
        self.log_level
            .parse()
            .map_err(|err: String| anyhow::anyhow!(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.runner, RunnerKind::Concurrent);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.default_timeout(), Duration::from_millis(2000));
        assert!(config.parallelism >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_load_yaml_and_json() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            runner: RunnerKind::Parallel,
            parallelism: 3,
            worker_idle_timeout_secs: Some(10),
            ..Default::default()
        };

        for name in ["rosespec.yaml", "nested/rosespec.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(RunConfig::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rosespec.yml");
        std::fs::write(&path, "runner: sequential\ndefault_timeout_ms: 0\n").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.runner, RunnerKind::Sequential);
        assert_eq!(config.default_timeout(), Duration::ZERO);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RunConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            format: "xml".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = RunConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON config"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = RunConfig::default();
        config.apply_env(&EnvConfig {
            runner: Some(RunnerKind::Sequential),
            timeout_ms: Some(500),
            format: Some("json".to_string()),
            ..Default::default()
        });
        assert_eq!(config.runner, RunnerKind::Sequential);
        assert_eq!(config.default_timeout_ms, 500);
        assert_eq!(config.output_format().unwrap(), OutputFormat::Json);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_runner_kind_parsing() {
        assert_eq!("Parallel".parse::<RunnerKind>(), Ok(RunnerKind::Parallel));
        assert!("threads".parse::<RunnerKind>().is_err());
        assert_eq!(RunnerKind::Sequential.to_string(), "sequential");
    }
}
