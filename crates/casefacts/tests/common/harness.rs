//! Isolated environment for end-to-end tests: a temp directory holding an
//! on-disk database and the upload directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use casefacts::db::case_repo::{self, CaseFileRow};
use casefacts::db::document_repo::DocumentRow;
use casefacts::db::job_repo::JobStatus;
use casefacts::worker::TickOutcome;
use casefacts::{intake, Database, FileStorage, Worker};

use super::builders::worker_config;

pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Database,
    pub storage: FileStorage,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("casefacts.db");
        let db = Database::open(&db_path).expect("Failed to open database");
        let storage = FileStorage::new(temp_dir.path().join("uploads"));

        Self {
            temp_dir,
            db_path,
            db,
            storage,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A second connection to the same database file, as another worker
    /// process would hold.
    pub fn open_second_handle(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to open second handle")
    }

    pub fn create_case(&self, name: &str) -> String {
        let case_file = CaseFileRow::new(name, None);
        case_repo::insert(&self.db, &case_file).expect("Failed to insert case file");
        case_file.id
    }

    pub fn upload(&self, case_id: &str, filename: &str, content: &[u8]) -> DocumentRow {
        intake::register_upload(&self.db, &self.storage, case_id, filename, None, content)
            .expect("Failed to register upload")
    }

    /// Uploads a file and queues its ingestion.
    pub fn upload_and_ingest(&self, case_id: &str, filename: &str, content: &[u8]) -> DocumentRow {
        let document = self.upload(case_id, filename, content);
        intake::request_ingestion(&self.db, &document.id).expect("Failed to queue ingestion");
        document
    }

    pub fn worker(&self, worker_id: &str) -> Worker {
        Worker::new(self.db.clone(), &worker_config(worker_id))
    }

    /// Ticks `worker` until the queue has nothing claimable.
    pub fn drain(&self, worker: &Worker) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = worker.tick().expect("Worker tick failed") {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Drains the queue and asserts every job finished `DONE`.
    pub fn drain_ok(&self, worker: &Worker) -> Vec<TickOutcome> {
        let outcomes = self.drain(worker);
        for outcome in &outcomes {
            assert_eq!(
                outcome.status,
                JobStatus::Done,
                "job {} ({}) did not finish",
                outcome.job_id,
                outcome.job_type
            );
        }
        outcomes
    }
}
