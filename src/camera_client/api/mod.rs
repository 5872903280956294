mod queries;
mod types;

pub use queries::{DateQuery, DeleteQuery};
pub use types::{
    ActionResponse, ActionStatus, AllDetectionsResponse, DetectionRecord,
    DetectionsByDateResponse, SystemStatsResponse,
};
