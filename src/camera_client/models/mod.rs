mod detections;
mod status;

pub use detections::{ActivityEntry, ActivityFeed, DetectionOverview};
pub use status::SystemStatus;
