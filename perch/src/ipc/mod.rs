mod client;
mod event_server;
mod server;

use std::path::{Path, PathBuf};

pub use client::{subscribe_and_print, EventClient, IpcClient};
pub use event_server::{EventServer, SnapshotRequests};
pub use server::{CommandSender, IpcServer};

/// Filesystem locations of the daemon's two unix sockets. The CLI and the
/// daemon must derive these the same way, so both go through [`Default`],
/// which places them in the per-user temp directory.
#[derive(Debug, Clone)]
pub struct SocketPaths {
    pub commands: PathBuf,
    pub events: PathBuf,
}

impl Default for SocketPaths {
    fn default() -> Self {
        Self::in_dir(std::env::temp_dir())
    }
}

impl SocketPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            commands: dir.join("perch.sock"),
            events: dir.join("perch-events.sock"),
        }
    }
}
