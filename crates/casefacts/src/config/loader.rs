use std::path::{Path, PathBuf};

use crate::config::schema::WorkerConfig;
use crate::error::ConfigError;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_ENV: &str = "CASEFACTS_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WorkerConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<WorkerConfig, ConfigError> {
    let config: WorkerConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Builds the effective configuration for a worker process.
///
/// Starts from the JSON file at `path` (or `$CASEFACTS_CONFIG`) when given,
/// otherwise from defaults, then applies environment overrides and validates.
pub fn resolve_config(path: Option<&Path>) -> Result<WorkerConfig, ConfigError> {
    let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let base = match path.map(Path::to_path_buf).or(env_path) {
        Some(p) => {
            let content = std::fs::read_to_string(&p).map_err(|e| ConfigError::ReadFile {
                path: p.clone(),
                source: e,
            })?;
            serde_json::from_str(&content)?
        }
        None => WorkerConfig::default(),
    };

    let config = apply_env_overrides(base, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Overrides fields from variables returned by `lookup`.
pub fn apply_env_overrides<F>(mut config: WorkerConfig, lookup: F) -> Result<WorkerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DATABASE_PATH") {
        config.database_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("UPLOAD_DIR") {
        config.upload_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("JOB_POLL_INTERVAL_MS") {
        config.poll_interval_ms = parse_millis("JOB_POLL_INTERVAL_MS", &v)?;
    }
    if let Some(v) = lookup("STALE_LOCK_TIMEOUT_MS") {
        config.stale_lock_timeout_ms = parse_millis("STALE_LOCK_TIMEOUT_MS", &v)?;
    }
    if let Some(v) = lookup("EXTRACTOR_VERSION") {
        config.extractor_version = v;
    }
    if let Some(v) = lookup("WORKER_ID") {
        config.worker_id = v;
    }
    Ok(config)
}

fn parse_millis(name: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub fn validate_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "pollIntervalMs must be a positive integer".to_string(),
        });
    }

    if config.extractor_version.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "extractorVersion must not be empty".to_string(),
        });
    }

    if config.upload_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "uploadDir must not be empty".to_string(),
        });
    }

    if config.worker_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "workerId must not be empty".to_string(),
        });
    }

    if config.stale_lock_timeout_ms < config.poll_interval_ms {
        return Err(ConfigError::Validation {
            message: format!(
                "staleLockTimeoutMs ({}) must be at least pollIntervalMs ({})",
                config.stale_lock_timeout_ms, config.poll_interval_ms
            ),
        });
    }

    Ok(())
}
