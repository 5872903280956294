//! Data-sync engine for the camera-surveillance dashboard.
//!
//! Polls the camera backend's JSON endpoints on independent schedules,
//! bounds concurrent in-flight requests, retries transient failures with a
//! capped backoff, and reconciles out-of-order responses into per-stream
//! view snapshots consumed by the rendering layer.

pub mod camera_client;
pub mod config;
pub mod sync;
pub mod types;
