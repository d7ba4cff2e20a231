//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for statewatch data on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/statewatch";

/// File name of the monitor socket inside the data directory.
pub const MONITOR_SOCKET_NAME: &str = "monitor.sock";

/// Application name used in CLI output and log targets.
pub const APP_NAME: &str = "statewatch";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "swatch";

/// Returns the data directory, preferring `$HOME/.statewatch` for non-root
/// or non-Linux environments, falling back to `/var/lib/statewatch`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".statewatch");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default monitor socket path.
pub fn default_socket_path() -> PathBuf {
    data_dir().join(MONITOR_SOCKET_NAME)
}
