pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod intake;
pub mod processor;
pub mod retrieval;
pub mod review;
pub mod storage;
pub mod worker;

pub use config::{load_config, resolve_config, WorkerConfig};
pub use db::{Database, DatabaseError};
pub use error::{CasefactsError, ConfigError, ProcessError, Result, StorageError, WorkerError};
pub use extraction::{extract_facts_from_page, FactDraft, FactValue};
pub use processor::{DocumentProcessor, PageText, ProcessorRegistry};
pub use retrieval::{retrieve_page_snippets, PageSnippet};
pub use storage::FileStorage;
pub use worker::{shutdown_channel, JobKind, Worker};
