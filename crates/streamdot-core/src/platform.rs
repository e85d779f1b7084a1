//! Filesystem locations and per-pipeline socket naming.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

const APP_DIR: &str = "streamdot";

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(1);

/// Unique IPC socket path per pipeline, so a stale socket left by a
/// discarded pipeline can never be picked up by its successor.
pub fn pipeline_socket_path() -> PathBuf {
    let n = NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("streamdot-mpv-{}-{}.sock", std::process::id(), n))
}
