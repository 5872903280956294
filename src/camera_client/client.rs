use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::types::SyncError;

use super::api::{
    ActionResponse, AllDetectionsResponse, DateQuery, DeleteQuery, DetectionsByDateResponse,
    SystemStatsResponse,
};

/// The backend operations the sync layer depends on. The seam between the
/// coordinator and the network; tests drive the coordinator through an
/// in-memory implementation.
#[async_trait]
pub trait DashboardApi: Send + Sync + 'static {
    async fn fetch_system_stats(&self) -> Result<SystemStatsResponse, SyncError>;
    async fn fetch_all_detections(&self) -> Result<AllDetectionsResponse, SyncError>;
    async fn fetch_detections_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<DetectionsByDateResponse, SyncError>;
    async fn switch_camera(&self, camera_id: &str) -> Result<ActionResponse, SyncError>;
    async fn delete_detection(&self, id: i64) -> Result<ActionResponse, SyncError>;
}

#[derive(Clone)]
pub struct CameraApiClient {
    http: Client,
    base_url: String,
}

impl CameraApiClient {
    /// Build a client against the configured backend, honoring the
    /// CAMERA_DASHBOARD_API_URL override.
    pub fn connect(config: &Config) -> Result<Self, SyncError> {
        let mut base_url = config.api_base_url.clone();
        if let Ok(custom) = env::var("CAMERA_DASHBOARD_API_URL") {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                base_url = trimmed.to_string();
            }
        }

        // Per-stream deadlines are enforced by the sync layer; this is a
        // safety cap for requests issued outside it.
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SyncError::Http)?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, SyncError>
    where
        T: DeserializeOwned,
    {
        self.get_json_with_query(path, &()).await
    }

    async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, SyncError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .http
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await
            .map_err(SyncError::Http)?;

        if !response.status().is_success() {
            return Err(SyncError::Backend(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }

        response.json::<T>().await.map_err(SyncError::Http)
    }

    async fn delete_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, SyncError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .http
            .delete(self.endpoint(path))
            .query(query)
            .send()
            .await
            .map_err(SyncError::Http)?;

        if !response.status().is_success() {
            return Err(SyncError::Backend(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }

        response.json::<T>().await.map_err(SyncError::Http)
    }
}

#[async_trait]
impl DashboardApi for CameraApiClient {
    async fn fetch_system_stats(&self) -> Result<SystemStatsResponse, SyncError> {
        self.get_json("/get_system_stats").await
    }

    async fn fetch_all_detections(&self) -> Result<AllDetectionsResponse, SyncError> {
        self.get_json("/get_all_detections").await
    }

    async fn fetch_detections_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<DetectionsByDateResponse, SyncError> {
        let query = DateQuery { date };
        self.get_json_with_query("/get_detections_by_date", &query)
            .await
    }

    async fn switch_camera(&self, camera_id: &str) -> Result<ActionResponse, SyncError> {
        self.get_json(&format!("/switch_camera/{camera_id}")).await
    }

    async fn delete_detection(&self, id: i64) -> Result<ActionResponse, SyncError> {
        let query = DeleteQuery { id };
        self.delete_json("/delete_detection", &query).await
    }
}
