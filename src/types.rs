use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// One independently pollable backend resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamId {
    SystemStats,
    Detections,
    Activity,
}

impl StreamId {
    pub const ALL: [StreamId; 3] = [StreamId::SystemStats, StreamId::Detections, StreamId::Activity];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamId::SystemStats => "system_stats",
            StreamId::Detections => "detections",
            StreamId::Activity => "activity",
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned an error: {0}")]
    Backend(String),

    #[error("{stream} request deadline elapsed")]
    Timeout { stream: StreamId },

    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },

    /// A newer attempt took over this stream. Internal discard signal,
    /// never surfaced to subscribers.
    #[error("attempt superseded by a newer refresh")]
    Superseded,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether this settlement carries data loss worth logging, as opposed
    /// to an internal discard.
    pub fn is_superseded(&self) -> bool {
        matches!(self, SyncError::Superseded)
    }
}
