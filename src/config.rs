use std::time::Duration;
use serde::{Serialize, Deserialize};
use anyhow::Context;

pub const ENV_INITIAL_STATE: &str = "LAMPORT_INITIAL_STATE";
pub const ENV_CHANNEL_CAPACITY: &str = "LAMPORT_CHANNEL_CAPACITY";
pub const ENV_STEP_DELAY_MS: &str = "LAMPORT_STEP_DELAY_MS";
pub const ENV_NAIVE_MAX_DELAY_MS: &str = "LAMPORT_NAIVE_MAX_DELAY_MS";

/// Settings of a single cluster run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Accumulator value every node starts with.
    pub initial_state: i64,
    /// Capacity of every submission and replication channel. Has to fit all messages that can be
    /// in flight during a run, otherwise senders get suspended.
    pub channel_capacity: usize,
    /// Pause between two consecutive scenario steps.
    #[serde(with = "millis")]
    pub step_delay: Duration,
    /// Upper bound of the random latency injected by naive clients.
    #[serde(with = "millis")]
    pub naive_max_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_state: 10,
            channel_capacity: 16,
            step_delay: Duration::from_millis(100),
            naive_max_delay: Duration::from_millis(100),
        }
    }
}

impl Config {

    /// Returns default config with values overridden by environment variables, if present.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> crate::Result<Self> where F: Fn(&str) -> Option<String> {
        let mut config = Config::default();
        if let Some(v) = var(ENV_INITIAL_STATE) {
            config.initial_state = v.trim().parse().with_context(|| format!("invalid {}: '{}'", ENV_INITIAL_STATE, v))?;
        }
        if let Some(v) = var(ENV_CHANNEL_CAPACITY) {
            config.channel_capacity = v.trim().parse().with_context(|| format!("invalid {}: '{}'", ENV_CHANNEL_CAPACITY, v))?;
        }
        if let Some(v) = var(ENV_STEP_DELAY_MS) {
            let ms: u64 = v.trim().parse().with_context(|| format!("invalid {}: '{}'", ENV_STEP_DELAY_MS, v))?;
            config.step_delay = Duration::from_millis(ms);
        }
        if let Some(v) = var(ENV_NAIVE_MAX_DELAY_MS) {
            let ms: u64 = v.trim().parse().with_context(|| format!("invalid {}: '{}'", ENV_NAIVE_MAX_DELAY_MS, v))?;
            config.naive_max_delay = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.channel_capacity == 0 {
            anyhow::bail!("channel capacity must be greater than 0");
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;
    use serde::{Serializer, Deserializer, Deserialize};

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error> where D: Deserializer<'de> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
