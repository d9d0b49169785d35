use crate::cloud::retry::RetryPolicy;
use crate::credentials::Credentials;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration passed into each wrapper's constructor.
///
/// Every section falls back to its defaults, so a partial file or a handful of
/// environment variables is enough.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub project: ProjectSettings,
    pub storage: StorageSettings,
    pub pubsub: PubSubSettings,
    pub logging: LoggingSettings,
}

/// Project identity and authentication.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectSettings {
    pub project_id: String,
    pub credentials_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    pub bucket: String,
}

/// Subscription pull sizing and the publish retry policy.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PubSubSettings {
    pub max_messages: u32,
    pub poll_interval_ms: u64,
    pub retry: RetrySettings,
}

/// Retry policy parameters in milliseconds.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub initial_ms: u64,
    pub maximum_ms: u64,
    pub multiplier: f64,
    pub deadline_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for PubSubSettings {
    fn default() -> Self {
        Self {
            max_messages: 10,
            poll_interval_ms: 100,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_ms: 100,
            maximum_ms: 60_000,
            multiplier: 1.3,
            deadline_ms: 60_000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::from_option(self.project.credentials_file.clone())
    }
}

impl RetrySettings {
    /// Retry policy with these timings and the default transient allow-list.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial: Duration::from_millis(self.initial_ms),
            maximum: Duration::from_millis(self.maximum_ms),
            multiplier: self.multiplier,
            deadline: Duration::from_millis(self.deadline_ms),
            ..RetryPolicy::default()
        }
    }
}
