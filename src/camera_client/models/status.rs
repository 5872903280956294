use serde::Serialize;

use super::super::api::SystemStatsResponse;
use super::super::helpers::format_uptime;

const CPU_HEALTHY_BELOW: f64 = 80.0;
const MEMORY_HEALTHY_BELOW: f64 = 80.0;

/// System health snapshot shown in the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SystemStatus {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub active_cameras: u32,
    pub total_cameras: u32,
    pub uptime_seconds: f64,
    pub healthy: bool,
}

impl SystemStatus {
    pub fn from_response(resp: SystemStatsResponse) -> Self {
        let healthy =
            resp.cpu_percent < CPU_HEALTHY_BELOW && resp.memory_percent < MEMORY_HEALTHY_BELOW;
        Self {
            cpu_percent: resp.cpu_percent,
            memory_percent: resp.memory_percent,
            disk_percent: resp.disk_percent,
            active_cameras: resp.active_cameras,
            total_cameras: resp.total_cameras,
            uptime_seconds: resp.uptime,
            healthy,
        }
    }

    pub fn uptime_label(&self) -> String {
        format_uptime(self.uptime_seconds)
    }

    /// "2/4" style camera availability label.
    pub fn camera_label(&self) -> String {
        format!("{}/{}", self.active_cameras, self.total_cameras)
    }
}
