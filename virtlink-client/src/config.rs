//! Client configuration: retry budgets per operation class.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::retry::RetryPolicy;

/// Retry budgets applied when a caller passes no override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Policy for get and list operations
    #[serde(deserialize_with = "read_policy")]
    pub read: RetryPolicy,
    /// Policy for create, update, attach, change, eject and remove
    #[serde(deserialize_with = "write_policy")]
    pub write: RetryPolicy,
}

/// A policy section as written in the file; unset keys keep the
/// section's own defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PolicyOverrides {
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
    max_backoff_ms: Option<u64>,
    attempt_timeout_ms: Option<u64>,
    overall_timeout_ms: Option<u64>,
    jitter: Option<bool>,
}

impl PolicyOverrides {
    fn apply(self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            initial_backoff_ms: self.initial_backoff_ms.unwrap_or(base.initial_backoff_ms),
            max_backoff_ms: self.max_backoff_ms.unwrap_or(base.max_backoff_ms),
            attempt_timeout_ms: self.attempt_timeout_ms.unwrap_or(base.attempt_timeout_ms),
            overall_timeout_ms: self.overall_timeout_ms.unwrap_or(base.overall_timeout_ms),
            jitter: self.jitter.unwrap_or(base.jitter),
        }
    }
}

fn read_policy<'de, D>(deserializer: D) -> std::result::Result<RetryPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(PolicyOverrides::deserialize(deserializer)?.apply(RetryPolicy::read_default()))
}

fn write_policy<'de, D>(deserializer: D) -> std::result::Result<RetryPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(PolicyOverrides::deserialize(deserializer)?.apply(RetryPolicy::write_default()))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read: RetryPolicy::read_default(),
            write: RetryPolicy::write_default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    ///
    /// Missing sections fall back to their defaults. A section that is
    /// present but partial fills the gaps from that section's defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ClientConfig = serde_yaml::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate both retry policies.
    pub fn validate(&self) -> Result<()> {
        self.read.validate().context("Invalid read retry policy")?;
        self.write.validate().context("Invalid write retry policy")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.write.max_attempts < config.read.max_attempts);
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
read:
  max_attempts: 7
  jitter: false
"#
        )
        .unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.read.max_attempts, 7);
        assert!(!config.read.jitter);
        assert_eq!(config.read.initial_backoff_ms, RetryPolicy::read_default().initial_backoff_ms);
        assert_eq!(config.write, RetryPolicy::write_default());
    }

    #[test]
    fn test_partial_write_section_keeps_write_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "write:\n  max_attempts: 4").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        let defaults = RetryPolicy::write_default();
        assert_eq!(config.write.max_attempts, 4);
        assert_eq!(config.write.attempt_timeout_ms, 60_000);
        assert_eq!(config.write.overall_timeout_ms, defaults.overall_timeout_ms);
        assert_eq!(config.write.initial_backoff_ms, defaults.initial_backoff_ms);
        assert_eq!(config.write.max_backoff_ms, defaults.max_backoff_ms);
        assert_eq!(config.read, RetryPolicy::read_default());
    }

    #[test]
    fn test_load_rejects_invalid_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "write:\n  max_attempts: 0").unwrap();

        let err = ClientConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("write"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ClientConfig::load("/nonexistent/virtlink.yaml").is_err());
    }
}
