use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Response from the system stats endpoint. The backend falls back to
/// zeroed fields when its own probes fail, so everything is defaulted.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SystemStatsResponse {
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_percent: f64,
    #[serde(default)]
    pub disk_percent: f64,
    #[serde(default)]
    pub active_cameras: u32,
    #[serde(default)]
    pub total_cameras: u32,
    /// Seconds since the camera system started.
    #[serde(default)]
    pub uptime: f64,
}

/// One stored detection event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: i64,
    pub camera_id: String,
    /// ISO-8601 timestamp as emitted by the backend.
    pub timestamp: String,
    /// Detection confidence in percent (0–100).
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub image_path: Option<String>,
}

/// Totals plus the most recent detections across all cameras.
/// `total_counts` maps camera name to count and carries a `"total"` key.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AllDetectionsResponse {
    #[serde(default)]
    pub total_counts: HashMap<String, u64>,
    #[serde(default)]
    pub recent_detections: Vec<DetectionRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct DetectionsByDateResponse {
    #[serde(default)]
    pub detections: Vec<DetectionRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Envelope returned by the mutating endpoints (camera switch, delete).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionResponse {
    pub status: ActionStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}
