use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CasefactsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidEnv {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unsupported mimetype for ingestion: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures scoped to a single job. The worker records these on the job row
/// and moves on to the next poll.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Invalid payload for {job_type}: {reason}")]
    InvalidPayload { job_type: String, reason: String },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

pub type Result<T> = std::result::Result<T, CasefactsError>;
