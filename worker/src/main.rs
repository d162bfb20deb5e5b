use std::path::PathBuf;
use std::process::ExitCode;

use casefacts::{resolve_config, shutdown_channel, Database, Worker, WorkerConfig};
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Routes `log` records from the library into a tracing subscriber.
fn init_logging(config: &WorkerConfig) {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records into tracing: {}", e);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

fn main() -> ExitCode {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    let config = match resolve_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("casefacts-worker: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    info!("Starting casefacts worker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Worker {} (database {}, uploads {}, poll {}ms, stale lock {}ms, extractor {})",
        config.worker_id,
        config.database_path.display(),
        config.upload_dir.display(),
        config.poll_interval_ms,
        config.stale_lock_timeout_ms,
        config.extractor_version
    );

    let db = match Database::open(&config.database_path) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    }) {
        warn!("Failed to install signal handler: {}", e);
    }

    Worker::new(db, &config).run(shutdown_rx);

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
