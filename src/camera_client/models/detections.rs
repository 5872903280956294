use std::collections::HashMap;

use serde::Serialize;

use super::super::api::{AllDetectionsResponse, DetectionRecord};
use super::super::helpers::{format_relative_time, is_today_local};

/// Detection counters and the recent-detections table for the dashboard view.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DetectionOverview {
    pub total: u64,
    /// Detections whose timestamp falls on the current local date.
    pub today: u64,
    pub per_camera: HashMap<String, u64>,
    pub recent: Vec<DetectionRecord>,
}

impl DetectionOverview {
    pub fn from_response(resp: AllDetectionsResponse) -> Self {
        let total = resp.total_counts.get("total").copied().unwrap_or(0);
        let per_camera = resp
            .total_counts
            .into_iter()
            .filter(|(name, _)| name != "total")
            .collect();
        let today = resp
            .recent_detections
            .iter()
            .filter(|d| is_today_local(&d.timestamp))
            .count() as u64;

        Self {
            total,
            today,
            per_camera,
            recent: resp.recent_detections,
        }
    }

    pub fn count_for(&self, camera_id: &str) -> u64 {
        self.per_camera.get(camera_id).copied().unwrap_or(0)
    }
}

/// One row of the live activity stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub camera_id: String,
    pub timestamp: String,
    pub confidence: f64,
    pub image_path: Option<String>,
}

impl ActivityEntry {
    /// Rendered lazily so snapshots compare by value while the label ages.
    pub fn relative_time(&self) -> String {
        format_relative_time(&self.timestamp)
    }

    pub fn confidence_label(&self) -> String {
        format!("{}%", self.confidence.round() as i64)
    }
}

impl From<DetectionRecord> for ActivityEntry {
    fn from(record: DetectionRecord) -> Self {
        Self {
            id: record.id,
            camera_id: record.camera_id,
            timestamp: record.timestamp,
            confidence: record.confidence,
            image_path: record.image_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ActivityFeed {
    pub entries: Vec<ActivityEntry>,
}

impl ActivityFeed {
    pub fn from_response(resp: AllDetectionsResponse) -> Self {
        Self {
            entries: resp
                .recent_detections
                .into_iter()
                .map(ActivityEntry::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;

    fn record(id: i64, camera: &str, timestamp: String) -> DetectionRecord {
        DetectionRecord {
            id,
            camera_id: camera.to_string(),
            timestamp,
            confidence: 87.4,
            image_path: None,
        }
    }

    fn response() -> AllDetectionsResponse {
        let today = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        AllDetectionsResponse {
            total_counts: HashMap::from([
                ("front_gate".to_string(), 5),
                ("garage".to_string(), 2),
                ("total".to_string(), 7),
            ]),
            recent_detections: vec![
                record(1, "front_gate", today.clone()),
                record(2, "garage", today),
                record(3, "front_gate", "2001-01-01T08:00:00".to_string()),
            ],
        }
    }

    #[test]
    fn overview_splits_total_from_per_camera_counts() {
        let overview = DetectionOverview::from_response(response());
        assert_eq!(overview.total, 7);
        assert_eq!(overview.count_for("front_gate"), 5);
        assert_eq!(overview.count_for("unknown"), 0);
        assert!(!overview.per_camera.contains_key("total"));
    }

    #[test]
    fn today_counts_only_current_local_date() {
        let overview = DetectionOverview::from_response(response());
        assert_eq!(overview.today, 2);
    }

    #[test]
    fn activity_feed_keeps_backend_order() {
        let feed = ActivityFeed::from_response(response());
        assert_eq!(feed.entries.len(), 3);
        assert_eq!(feed.entries[0].id, 1);
        assert_eq!(feed.entries[0].confidence_label(), "87%");
        assert_eq!(feed.entries[0].relative_time(), "just now");
    }
}
