use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use camera_dashboard_backend::camera_client::CameraApiClient;
use camera_dashboard_backend::config::Config;
use camera_dashboard_backend::sync::{Poller, RequestGate, SyncCoordinator, Visibility};
use camera_dashboard_backend::types::StreamId;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load().await;
    let api = match CameraApiClient::connect(&config) {
        Ok(api) => api,
        Err(err) => {
            error!(error = %err, "Failed to build backend API client");
            return;
        }
    };

    let coordinator = SyncCoordinator::new(api, &config);
    let gate = Arc::new(RequestGate::new(config.gate_capacity));
    let visibility = Visibility::new();
    let poller = Poller::new(gate, visibility.clone());
    let tasks = poller.spawn(&coordinator);

    // Stand-in for the rendering layer: log accepted snapshot transitions.
    for stream in StreamId::ALL {
        let mut snapshots = coordinator.subscribe(stream);
        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                info!(
                    stream = %stream,
                    sequence = snapshot.sequence,
                    degraded = snapshot.degraded,
                    "snapshot updated"
                );
            }
        });
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
    for task in tasks {
        task.abort();
    }
}
