use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings consumed by the background worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Stamped onto every fact source written by this worker.
    #[serde(default = "default_extractor_version")]
    pub extractor_version: String,
    /// A job locked for longer than this is considered abandoned and requeued.
    #[serde(default = "default_stale_lock_timeout_ms")]
    pub stale_lock_timeout_ms: u64,
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_database_path() -> PathBuf {
    crate::db::default_database_path().unwrap_or_else(|| PathBuf::from("casefacts.db"))
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("/app/data/uploads")
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_extractor_version() -> String {
    "v1".to_string()
}

fn default_stale_lock_timeout_ms() -> u64 {
    600_000
}

fn default_worker_id() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()))
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            upload_dir: default_upload_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            extractor_version: default_extractor_version(),
            stale_lock_timeout_ms: default_stale_lock_timeout_ms(),
            worker_id: default_worker_id(),
            log_json: false,
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_lock_timeout_ms)
    }
}
