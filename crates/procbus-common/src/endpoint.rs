//! Endpoint naming.
//!
//! An endpoint is the string naming a process's inbound channel. It maps to
//! a Unix domain socket under a shared directory, so any process on the host
//! can connect by name without prior coordination.

use std::path::PathBuf;

/// Well-known endpoint of the host's single registry server.
pub const REGISTRY_ENDPOINT: &str = "procbus-registry";

/// Directory holding all procbus sockets on this host.
pub fn socket_dir() -> PathBuf {
    std::env::temp_dir().join("procbus")
}

/// Filesystem path of the socket backing an endpoint name.
pub fn socket_path(endpoint: &str) -> PathBuf {
    socket_dir().join(format!("{endpoint}.sock"))
}

/// This process's own endpoint name, derived from its OS process id.
///
/// Stable for the process's lifetime and used as the registry key.
pub fn process_endpoint() -> String {
    format!("procbus-{}", std::process::id())
}

/// Best-effort human-readable name of the current process.
pub fn process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
