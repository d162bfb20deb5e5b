//! Document and page repository.
//!
//! Pages are never patched in place: `replace_pages` swaps the full set for a
//! document inside one transaction.

use rusqlite::{params, Row};

use super::{now_timestamp, text_enum, Database, DatabaseError};
use crate::processor::PageText;

text_enum! {
    /// Ingestion state of a document. After a failed ingestion the cause is
    /// kept in `error` and the status falls back (see `mark_failed`).
    pub enum DocumentStatus {
        Uploaded => "UPLOADED",
        Ingesting => "INGESTING",
        Ingested => "INGESTED",
    }
}

/// Where the document bytes live. Only local disk is supported.
pub const STORAGE_LOCAL: &str = "LOCAL";

#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: String,
    pub case_file_id: String,
    pub filename: String,
    pub mimetype: String,
    pub size_bytes: i64,
    pub storage_kind: String,
    pub storage_path: String,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            case_file_id: row.get("case_file_id")?,
            filename: row.get("filename")?,
            mimetype: row.get("mimetype")?,
            size_bytes: row.get("size_bytes")?,
            storage_kind: row.get("storage_kind")?,
            storage_path: row.get("storage_path")?,
            status: row.get("status")?,
            error: row.get("error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// One stored page of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub document_id: String,
    pub page_number: u32,
    pub text: String,
    pub ocr_used: bool,
}

impl PageRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            document_id: row.get("document_id")?,
            page_number: row.get("page_number")?,
            text: row.get("text")?,
            ocr_used: row.get("ocr_used")?,
        })
    }
}

pub fn insert(db: &Database, doc: &DocumentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, case_file_id, filename, mimetype, size_bytes,
             storage_kind, storage_path, status, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.id,
                doc.case_file_id,
                doc.filename,
                doc.mimetype,
                doc.size_bytes,
                doc.storage_kind,
                doc.storage_path,
                doc.status,
                doc.error,
                doc.created_at,
                doc.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], DocumentRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Marks a document as queued or running for ingestion and clears its error.
///
/// Only a document without pages moves to `INGESTING`. One that already holds
/// pages stays `INGESTED`, so extraction and search keep seeing them until
/// `replace_pages` swaps them. Returns whether the document exists.
pub fn begin_ingestion(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET
               status = CASE WHEN EXISTS (SELECT 1 FROM document_pages WHERE document_id = ?1)
                        THEN ?2 ELSE ?3 END,
               error = NULL,
               updated_at = ?4
             WHERE id = ?1",
            params![
                id,
                DocumentStatus::Ingested,
                DocumentStatus::Ingesting,
                now_timestamp()
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Records an ingestion failure.
///
/// A document that still holds pages from an earlier successful run goes back
/// to `INGESTED` so those pages stay searchable; otherwise it returns to
/// `UPLOADED`.
pub fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET
               status = CASE WHEN EXISTS (SELECT 1 FROM document_pages WHERE document_id = ?1)
                        THEN ?3 ELSE ?4 END,
               error = ?2,
               updated_at = ?5
             WHERE id = ?1",
            params![
                id,
                error,
                DocumentStatus::Ingested,
                DocumentStatus::Uploaded,
                now_timestamp()
            ],
        )?;
        Ok(())
    })
}

/// Replaces every page of a document and marks it `INGESTED`, atomically.
/// Returns the number of pages written.
pub fn replace_pages(
    db: &Database,
    document_id: &str,
    pages: &[PageText],
) -> Result<usize, DatabaseError> {
    db.with_tx(|conn| {
        conn.execute(
            "DELETE FROM document_pages WHERE document_id = ?1",
            params![document_id],
        )?;

        let now = now_timestamp();
        {
            let mut stmt = conn.prepare(
                "INSERT INTO document_pages (id, document_id, page_number, text, ocr_used, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            )?;
            for page in pages {
                stmt.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    document_id,
                    page.page_number,
                    page.text,
                    now,
                ])?;
            }
        }

        conn.execute(
            "UPDATE documents SET status = ?2, error = NULL, updated_at = ?3 WHERE id = ?1",
            params![document_id, DocumentStatus::Ingested, now],
        )?;

        Ok(pages.len())
    })
}

pub fn pages_for_document(db: &Database, document_id: &str) -> Result<Vec<PageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT document_id, page_number, text, ocr_used FROM document_pages
             WHERE document_id = ?1 ORDER BY page_number ASC",
        )?;
        let rows = stmt
            .query_map(params![document_id], PageRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Pages of every `INGESTED` document of a case, ordered by document id then
/// page number.
pub fn ingested_pages_for_case(db: &Database, case_id: &str) -> Result<Vec<PageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT p.document_id, p.page_number, p.text, p.ocr_used
             FROM document_pages p
             JOIN documents d ON d.id = p.document_id
             WHERE d.case_file_id = ?1 AND d.status = ?2
             ORDER BY p.document_id ASC, p.page_number ASC",
        )?;
        let rows = stmt
            .query_map(params![case_id, DocumentStatus::Ingested], PageRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
