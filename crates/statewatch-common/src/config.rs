//! Global configuration model for the statewatch monitor.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for a statewatch monitoring domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatewatchConfig {
    /// Base directory for statewatch state and data.
    pub data_dir: PathBuf,
    /// Path to the monitor socket.
    pub socket_path: PathBuf,
    /// Default wait timeout in seconds; negative means wait forever.
    pub default_timeout_secs: i64,
}

impl Default for StatewatchConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::constants::data_dir().clone(),
            socket_path: crate::constants::default_socket_path(),
            default_timeout_secs: -1,
        }
    }
}
