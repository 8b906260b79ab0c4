//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::RunnerKind;

/// Environment variable prefix
const ENV_PREFIX: &str = "ROSESPEC";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Runner from ROSESPEC_RUNNER
    pub runner: Option<RunnerKind>,
    /// Concurrency from ROSESPEC_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Parallelism from ROSESPEC_PARALLELISM
    pub parallelism: Option<usize>,
    /// Worker concurrency from ROSESPEC_CHILD_CONCURRENCY
    pub child_concurrency: Option<usize>,
    /// Default timeout from ROSESPEC_TIMEOUT (milliseconds)
    pub timeout_ms: Option<u64>,
    /// Worker idle timeout from ROSESPEC_WORKER_IDLE_TIMEOUT (seconds)
    pub worker_idle_timeout_secs: Option<u64>,
    /// Output format from ROSESPEC_FORMAT
    pub format: Option<String>,
    /// Log level from ROSESPEC_LOG
    pub log_level: Option<String>,
    /// Config file from ROSESPEC_CONFIG
    pub config_file: Option<String>,
    /// Test selection from ROSESPEC_GREP
    pub grep: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            runner: get_env_parse("RUNNER"),
            concurrency: get_env_parse("CONCURRENCY"),
            parallelism: get_env_parse("PARALLELISM"),
            child_concurrency: get_env_parse("CHILD_CONCURRENCY"),
            timeout_ms: get_env_parse("TIMEOUT"),
            worker_idle_timeout_secs: get_env_parse("WORKER_IDLE_TIMEOUT"),
            format: get_env("FORMAT"),
            log_level: get_env("LOG"),
            config_file: get_env("CONFIG"),
            grep: get_env("GREP"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.runner.is_some()
            || self.concurrency.is_some()
            || self.parallelism.is_some()
            || self.child_concurrency.is_some()
            || self.timeout_ms.is_some()
            || self.worker_idle_timeout_secs.is_some()
            || self.format.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
            || self.grep.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Builder for setting environment variables (useful for testing)
#[derive(Default)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set any `ROSESPEC_*` variable by suffix
    pub fn var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_{name}"), value.to_string()));
        self
    }

    pub fn runner(self, runner: RunnerKind) -> Self {
        self.var("RUNNER", runner)
    }

    pub fn concurrency(self, concurrency: usize) -> Self {
        self.var("CONCURRENCY", concurrency)
    }

    pub fn timeout_ms(self, timeout: u64) -> Self {
        self.var("TIMEOUT", timeout)
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.runner.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .runner(RunnerKind::Parallel)
            .concurrency(7)
            .timeout_ms(250)
            .var("GREP", "/quux$/")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.runner, Some(RunnerKind::Parallel));
        assert_eq!(config.concurrency, Some(7));
        assert_eq!(config.timeout_ms, Some(250));
        assert_eq!(config.grep.as_deref(), Some("/quux$/"));
        assert!(config.has_any());
    }

    #[test]
    fn test_unparseable_values_are_ignored() {
        let _guard = EnvBuilder::new()
            .var("PARALLELISM", "many")
            .apply_scoped();

        assert_eq!(EnvConfig::load().parallelism, None);
    }
}
