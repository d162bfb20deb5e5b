//! Raw page search queries, scoped to the `INGESTED` documents of one case.

use rusqlite::{params, Row};

use super::document_repo::DocumentStatus;
use super::{Database, DatabaseError};

/// A page matched by the full-text index. Higher `rank` is more relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPage {
    pub document_id: String,
    pub page_number: u32,
    pub text: String,
    pub rank: f64,
}

impl RankedPage {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            document_id: row.get("document_id")?,
            page_number: row.get("page_number")?,
            text: row.get("text")?,
            rank: row.get("rank")?,
        })
    }
}

/// Runs an FTS5 `MATCH` expression and returns the best `limit` pages.
///
/// `bm25()` is lower-is-better, so it is negated into `rank`.
pub fn ranked_pages(
    db: &Database,
    case_id: &str,
    match_expr: &str,
    limit: usize,
) -> Result<Vec<RankedPage>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT p.document_id, p.page_number, p.text,
                    -bm25(document_pages_fts) AS rank
             FROM document_pages_fts
             JOIN document_pages p ON p.rowid = document_pages_fts.rowid
             JOIN documents d ON d.id = p.document_id
             WHERE document_pages_fts MATCH ?1
               AND d.case_file_id = ?2
               AND d.status = ?3
             ORDER BY bm25(document_pages_fts) ASC, p.rowid ASC
             LIMIT ?4",
        )?;
        let rows = stmt
            .query_map(
                params![match_expr, case_id, DocumentStatus::Ingested, limit as i64],
                RankedPage::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Feeds each page of the case to `visit` in storage order until it returns
/// `false`.
pub fn pages_in_scan_order<F>(db: &Database, case_id: &str, mut visit: F) -> Result<(), DatabaseError>
where
    F: FnMut(&str, u32, &str) -> bool,
{
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT p.document_id, p.page_number, p.text
             FROM document_pages p
             JOIN documents d ON d.id = p.document_id
             WHERE d.case_file_id = ?1 AND d.status = ?2
             ORDER BY p.rowid ASC",
        )?;
        let mut rows = stmt.query(params![case_id, DocumentStatus::Ingested])?;
        while let Some(row) = rows.next()? {
            let document_id: String = row.get(0)?;
            let page_number: u32 = row.get(1)?;
            let text: String = row.get(2)?;
            if !visit(&document_id, page_number, &text) {
                break;
            }
        }
        Ok(())
    })
}
