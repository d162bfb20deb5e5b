use std::path::PathBuf;

use crate::db::document_repo;
use crate::db::{fact_repo, job_repo::JobRow, Database};
use crate::error::{ProcessError, WorkerError};
use crate::extraction::extract_facts_from_page;
use crate::processor::ProcessorRegistry;
use crate::worker::job::JobKind;

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobReport {
    Ingested { document_id: String, pages: usize },
    FactsExtracted { case_file_id: String, pages: usize, facts: usize },
}

/// Executes claimed jobs against the store.
pub struct JobRunner {
    db: Database,
    registry: ProcessorRegistry,
    extractor_version: String,
}

impl JobRunner {
    pub fn new(db: Database, extractor_version: &str) -> Self {
        Self {
            db,
            registry: ProcessorRegistry::new(),
            extractor_version: extractor_version.to_string(),
        }
    }

    pub fn run_job(&self, job: &JobRow) -> Result<JobReport, WorkerError> {
        match JobKind::from_job(job)? {
            JobKind::IngestDocument { document_id } => self.ingest_document(&document_id),
            JobKind::ExtractFacts { case_file_id } => self.extract_facts(&case_file_id),
        }
    }

    /// Replaces the pages of a document with freshly extracted ones.
    ///
    /// Everything that can fail happens before the page swap, which is a
    /// single transaction; a failure leaves earlier pages in place and
    /// records the error on the document.
    fn ingest_document(&self, document_id: &str) -> Result<JobReport, WorkerError> {
        let document = document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| WorkerError::DocumentNotFound(document_id.to_string()))?;

        document_repo::begin_ingestion(&self.db, &document.id)?;

        let extracted = if self.registry.supports(&document.mimetype) {
            let path = PathBuf::from(&document.storage_path);
            std::fs::read(&path)
                .map_err(|e| ProcessError::ReadDocument { path, source: e })
                .and_then(|bytes| self.registry.extract_pages(&document.mimetype, &bytes))
        } else {
            Err(ProcessError::UnsupportedFormat(document.mimetype.clone()))
        };

        let pages = match extracted {
            Ok(pages) => pages,
            Err(e) => {
                document_repo::mark_failed(&self.db, &document.id, &e.to_string())?;
                return Err(e.into());
            }
        };

        let count = match document_repo::replace_pages(&self.db, &document.id, &pages) {
            Ok(count) => count,
            Err(e) => {
                document_repo::mark_failed(&self.db, &document.id, &e.to_string())?;
                return Err(e.into());
            }
        };
        log::info!("Ingested document {} ({} pages)", document.id, count);

        Ok(JobReport::Ingested {
            document_id: document.id,
            pages: count,
        })
    }

    /// Re-runs every extractor over the ingested pages of a case.
    fn extract_facts(&self, case_file_id: &str) -> Result<JobReport, WorkerError> {
        let pages = document_repo::ingested_pages_for_case(&self.db, case_file_id)?;

        let drafts: Vec<_> = pages
            .iter()
            .flat_map(|p| extract_facts_from_page(&p.document_id, p.page_number, &p.text))
            .collect();

        let facts =
            fact_repo::replace_extracted(&self.db, case_file_id, &drafts, &self.extractor_version)?;
        log::info!(
            "Extracted {} facts from {} pages for case {}",
            facts,
            pages.len(),
            case_file_id
        );

        Ok(JobReport::FactsExtracted {
            case_file_id: case_file_id.to_string(),
            pages: pages.len(),
            facts,
        })
    }
}
