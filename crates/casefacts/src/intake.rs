//! Entry points used by the web layer: store an upload, then queue work on it.

use serde_json::json;

use crate::db::document_repo::{self, DocumentRow, DocumentStatus, STORAGE_LOCAL};
use crate::db::job_repo::{self, JobRow, JOB_EXTRACT_FACTS, JOB_INGEST_DOCUMENT};
use crate::db::{case_repo, now_timestamp, Database};
use crate::error::{CasefactsError, Result};
use crate::storage::FileStorage;

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

fn resolve_mimetype(filename: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or(FALLBACK_MIMETYPE)
            .to_string(),
    }
}

/// Saves an uploaded file under the case directory and records it as an
/// `UPLOADED` document. The mimetype is guessed from the filename when the
/// client did not declare one.
pub fn register_upload(
    db: &Database,
    storage: &FileStorage,
    case_id: &str,
    filename: &str,
    mimetype: Option<&str>,
    content: &[u8],
) -> Result<DocumentRow> {
    if case_repo::find_by_id(db, case_id)?.is_none() {
        return Err(CasefactsError::NotFound {
            kind: "Case file",
            id: case_id.to_string(),
        });
    }

    let path = storage.store_upload(case_id, filename, content)?;

    let now = now_timestamp();
    let document = DocumentRow {
        id: uuid::Uuid::new_v4().to_string(),
        case_file_id: case_id.to_string(),
        filename: if filename.is_empty() { "document" } else { filename }.to_string(),
        mimetype: resolve_mimetype(filename, mimetype),
        size_bytes: content.len() as i64,
        storage_kind: STORAGE_LOCAL.to_string(),
        storage_path: path.to_string_lossy().into_owned(),
        status: DocumentStatus::Uploaded,
        error: None,
        created_at: now.clone(),
        updated_at: now,
    };
    document_repo::insert(db, &document)?;

    log::info!(
        "Registered upload {} for case {} as document {}",
        document.filename,
        case_id,
        document.id
    );
    Ok(document)
}

/// Queues an `INGEST_DOCUMENT` job. A document without pages is marked
/// `INGESTING`; one with pages stays `INGESTED` until new pages replace them.
pub fn request_ingestion(db: &Database, document_id: &str) -> Result<JobRow> {
    let document = document_repo::find_by_id(db, document_id)?.ok_or_else(|| {
        CasefactsError::NotFound {
            kind: "Document",
            id: document_id.to_string(),
        }
    })?;

    document_repo::begin_ingestion(db, &document.id)?;
    let job = job_repo::enqueue(
        db,
        JOB_INGEST_DOCUMENT,
        &json!({ "documentId": document.id }),
        Some(&document.case_file_id),
        None,
    )?;
    Ok(job)
}

/// Queues an `EXTRACT_FACTS` job for the case.
pub fn request_fact_extraction(db: &Database, case_id: &str) -> Result<JobRow> {
    if case_repo::find_by_id(db, case_id)?.is_none() {
        return Err(CasefactsError::NotFound {
            kind: "Case file",
            id: case_id.to_string(),
        });
    }

    let job = job_repo::enqueue(
        db,
        JOB_EXTRACT_FACTS,
        &json!({ "caseFileId": case_id }),
        Some(case_id),
        None,
    )?;
    Ok(job)
}
