use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::StreamId;

/// Configuration for the dashboard sync backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Maximum concurrent in-flight backend requests.
    #[serde(default = "default_gate_capacity")]
    pub gate_capacity: usize,

    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,

    #[serde(default = "default_detections_interval_secs")]
    pub detections_interval_secs: u64,

    #[serde(default = "default_activity_interval_secs")]
    pub activity_interval_secs: u64,

    #[serde(default = "default_stats_timeout_secs")]
    pub stats_timeout_secs: u64,

    #[serde(default = "default_detections_timeout_secs")]
    pub detections_timeout_secs: u64,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            gate_capacity: default_gate_capacity(),
            stats_interval_secs: default_stats_interval_secs(),
            detections_interval_secs: default_detections_interval_secs(),
            activity_interval_secs: default_activity_interval_secs(),
            stats_timeout_secs: default_stats_timeout_secs(),
            detections_timeout_secs: default_detections_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Refresh cadence and per-request deadline for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSchedule {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Config {
    /// Schedule for a stream. System stats poll more often with a tighter
    /// deadline; detection lists are heavier and get more slack.
    pub fn schedule(&self, stream: StreamId) -> StreamSchedule {
        match stream {
            StreamId::SystemStats => StreamSchedule {
                interval: Duration::from_secs(self.stats_interval_secs),
                deadline: Duration::from_secs(self.stats_timeout_secs),
            },
            StreamId::Detections => StreamSchedule {
                interval: Duration::from_secs(self.detections_interval_secs),
                deadline: Duration::from_secs(self.detections_timeout_secs),
            },
            StreamId::Activity => StreamSchedule {
                interval: Duration::from_secs(self.activity_interval_secs),
                deadline: Duration::from_secs(self.detections_timeout_secs),
            },
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_gate_capacity() -> usize {
    4
}

fn default_stats_interval_secs() -> u64 {
    10
}

fn default_detections_interval_secs() -> u64 {
    30
}

fn default_activity_interval_secs() -> u64 {
    30
}

fn default_stats_timeout_secs() -> u64 {
    5
}

fn default_detections_timeout_secs() -> u64 {
    8
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}
