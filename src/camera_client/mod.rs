mod api;
mod client;
mod helpers;
mod models;

pub use api::{
    ActionResponse, ActionStatus, AllDetectionsResponse, DetectionRecord,
    DetectionsByDateResponse, SystemStatsResponse,
};
pub use client::{CameraApiClient, DashboardApi};
pub use models::{ActivityEntry, ActivityFeed, DetectionOverview, SystemStatus};
