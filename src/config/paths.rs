use std::path::PathBuf;
use tracing::{debug, warn};

use crate::types::SyncError;

/// Get the path to the config.json file.
/// Looks for config.json in the app directory (parent of the backend folder).
pub(super) fn get_config_path() -> Result<PathBuf, SyncError> {
    // Executable is at: app_root/backend/camera-dashboard-backend
    // Config should be at: app_root/config.json
    if let Ok(exe_path) = std::env::current_exe() {
        debug!(path = %exe_path.display(), "Executable path detected");

        if let Some(backend_dir) = exe_path.parent() {
            if let Some(app_root) = backend_dir.parent() {
                let config_path = app_root.join("config.json");
                debug!(path = %config_path.display(), "Looking for config");
                return Ok(config_path);
            }
        }
    }

    // Fallback: look in current directory
    warn!("Using fallback: looking for config.json in current directory");
    Ok(PathBuf::from("config.json"))
}
