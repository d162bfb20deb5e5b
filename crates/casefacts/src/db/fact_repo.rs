//! Fact and provenance repository.
//!
//! Facts with status `extracted` belong to the machine and are replaced
//! wholesale on every extraction run. `validated` and `rejected` facts carry
//! a human decision and are never touched by `replace_extracted`.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use super::{now_timestamp, text_enum, Database, DatabaseError};
use crate::extraction::excerpt::MAX_EXCERPT_CHARS;
use crate::extraction::{FactDraft, FactValue, Locator};
use crate::processor::text::truncate_chars;

text_enum! {
    pub enum FactStatus {
        Extracted => "extracted",
        Validated => "validated",
        Rejected => "rejected",
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct FactSourceRow {
    pub document_id: String,
    pub page_number: u32,
    pub excerpt: String,
    pub locator: Option<Locator>,
    pub extractor_version: String,
    pub extracted_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub id: String,
    pub case_file_id: String,
    pub fact_type: String,
    pub label: String,
    pub value: FactValue,
    pub unit: Option<String>,
    pub currency: Option<String>,
    pub confidence: f64,
    pub status: FactStatus,
    pub created_at: String,
    pub updated_at: String,
    pub sources: Vec<FactSourceRow>,
}

impl FactRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            case_file_id: row.get("case_file_id")?,
            fact_type: row.get("fact_type")?,
            label: row.get("label")?,
            value: value_from_row(row)?,
            unit: row.get("unit")?,
            currency: row.get("currency")?,
            confidence: row.get("confidence")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            sources: Vec::new(),
        })
    }
}

impl FactSourceRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let start: Option<i64> = row.get("locator_start")?;
        let end: Option<i64> = row.get("locator_end")?;
        Ok(Self {
            document_id: row.get("document_id")?,
            page_number: row.get("page_number")?,
            excerpt: row.get("excerpt")?,
            locator: start.zip(end).map(|(start, end)| Locator {
                start: start as usize,
                end: end as usize,
            }),
            extractor_version: row.get("extractor_version")?,
            extracted_at: row.get("extracted_at")?,
        })
    }
}

/// Human corrections to a fact. `None` leaves the field as is; for `unit`
/// and `currency`, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct FactEdit {
    pub label: Option<String>,
    pub value: Option<FactValue>,
    pub unit: Option<Option<String>>,
    pub currency: Option<Option<String>>,
}

fn value_columns(value: &FactValue) -> (Option<&str>, Option<f64>, Option<String>) {
    match value {
        FactValue::Text(s) => (Some(s.as_str()), None, None),
        FactValue::Number(n) => (None, Some(*n), None),
        FactValue::Date(d) => (None, None, Some(d.format(DATE_FORMAT).to_string())),
    }
}

fn value_from_row(row: &Row<'_>) -> Result<FactValue, rusqlite::Error> {
    if let Some(s) = row.get::<_, Option<String>>("value_string")? {
        return Ok(FactValue::Text(s));
    }
    if let Some(n) = row.get::<_, Option<f64>>("value_number")? {
        return Ok(FactValue::Number(n));
    }
    let idx = row.as_ref().column_index("value_date")?;
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map(FactValue::Date)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Deletes every `extracted` fact of the case and inserts `drafts` in their
/// place, each with one source stamped with `extractor_version`.
///
/// Runs as a single transaction. Returns the number of facts inserted.
pub fn replace_extracted(
    db: &Database,
    case_id: &str,
    drafts: &[FactDraft],
    extractor_version: &str,
) -> Result<usize, DatabaseError> {
    db.with_tx(|conn| {
        let removed = conn.execute(
            "DELETE FROM facts WHERE case_file_id = ?1 AND status = ?2",
            params![case_id, FactStatus::Extracted],
        )?;

        let now = now_timestamp();
        let mut insert_fact = conn.prepare(
            "INSERT INTO facts (id, case_file_id, fact_type, label, value_string, value_number,
             value_date, unit, currency, confidence, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        )?;
        let mut insert_source = conn.prepare(
            "INSERT INTO fact_sources (id, fact_id, document_id, page_number, excerpt,
             locator_start, locator_end, extractor_version, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        for draft in drafts {
            let fact_id = uuid::Uuid::new_v4().to_string();
            let (text, number, date) = value_columns(&draft.value);
            insert_fact.execute(params![
                fact_id,
                case_id,
                draft.fact_type,
                draft.label,
                text,
                number,
                date,
                draft.unit,
                draft.currency,
                draft.confidence,
                FactStatus::Extracted,
                now,
            ])?;

            let source = &draft.source;
            insert_source.execute(params![
                uuid::Uuid::new_v4().to_string(),
                fact_id,
                source.document_id,
                source.page_number,
                truncate_chars(&source.excerpt, MAX_EXCERPT_CHARS),
                source.locator.start as i64,
                source.locator.end as i64,
                extractor_version,
                now,
            ])?;
        }

        log::debug!(
            "Replaced {} extracted facts with {} for case {}",
            removed,
            drafts.len(),
            case_id
        );

        Ok(drafts.len())
    })
}

/// All facts of a case with their sources, in insertion order.
pub fn list_for_case(db: &Database, case_id: &str) -> Result<Vec<FactRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM facts WHERE case_file_id = ?1 ORDER BY rowid ASC")?;
        let mut facts = stmt
            .query_map(params![case_id], FactRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sources = sources_for_case(conn, case_id)?;
        for fact in &mut facts {
            fact.sources = sources.remove(&fact.id).unwrap_or_default();
        }
        Ok(facts)
    })
}

fn sources_for_case(
    conn: &Connection,
    case_id: &str,
) -> Result<HashMap<String, Vec<FactSourceRow>>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.fact_id, s.* FROM fact_sources s
         JOIN facts f ON f.id = s.fact_id
         WHERE f.case_file_id = ?1
         ORDER BY s.rowid ASC",
    )?;
    let rows = stmt.query_map(params![case_id], |row| {
        Ok((row.get::<_, String>(0)?, FactSourceRow::from_row(row)?))
    })?;

    let mut by_fact: HashMap<String, Vec<FactSourceRow>> = HashMap::new();
    for row in rows {
        let (fact_id, source) = row?;
        by_fact.entry(fact_id).or_default().push(source);
    }
    Ok(by_fact)
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<FactRow>, DatabaseError> {
    db.with_conn(|conn| find_in(conn, id))
}

fn find_in(conn: &Connection, id: &str) -> Result<Option<FactRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM facts WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], FactRow::from_row)?;
    let mut fact = match rows.next() {
        Some(Ok(row)) => row,
        Some(Err(e)) => return Err(DatabaseError::Sqlite(e)),
        None => return Ok(None),
    };

    let mut stmt =
        conn.prepare("SELECT * FROM fact_sources WHERE fact_id = ?1 ORDER BY rowid ASC")?;
    fact.sources = stmt
        .query_map(params![id], FactSourceRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(fact))
}

/// Records a review decision. Returns whether the fact exists.
pub fn set_status(db: &Database, id: &str, status: FactStatus) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE facts SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, now_timestamp()],
        )?;
        Ok(changed == 1)
    })
}

/// Applies a human edit and marks the fact `validated`.
pub fn edit(db: &Database, id: &str, changes: &FactEdit) -> Result<Option<FactRow>, DatabaseError> {
    db.with_tx(|conn| {
        let Some(mut fact) = find_in(conn, id)? else {
            return Ok(None);
        };

        if let Some(label) = &changes.label {
            fact.label = label.clone();
        }
        if let Some(value) = &changes.value {
            fact.value = value.clone();
        }
        if let Some(unit) = &changes.unit {
            fact.unit = unit.clone();
        }
        if let Some(currency) = &changes.currency {
            fact.currency = currency.clone();
        }
        fact.status = FactStatus::Validated;
        fact.updated_at = now_timestamp();

        let (text, number, date) = value_columns(&fact.value);
        conn.execute(
            "UPDATE facts SET label = ?2, value_string = ?3, value_number = ?4, value_date = ?5,
             unit = ?6, currency = ?7, status = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                id,
                fact.label,
                text,
                number,
                date,
                fact.unit,
                fact.currency,
                fact.status,
                fact.updated_at,
            ],
        )?;

        Ok(Some(fact))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::case_repo::{self, CaseFileRow};
    use crate::db::document_repo::{self, DocumentRow, DocumentStatus, STORAGE_LOCAL};
    use crate::extraction::SourceDraft;

    fn test_db() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let case_file = CaseFileRow::new("Case", None);
        case_repo::insert(&db, &case_file).unwrap();

        let now = now_timestamp();
        document_repo::insert(
            &db,
            &DocumentRow {
                id: "doc-1".to_string(),
                case_file_id: case_file.id.clone(),
                filename: "acte.pdf".to_string(),
                mimetype: "application/pdf".to_string(),
                size_bytes: 10,
                storage_kind: STORAGE_LOCAL.to_string(),
                storage_path: "/tmp/acte.pdf".to_string(),
                status: DocumentStatus::Ingested,
                error: None,
                created_at: now.clone(),
                updated_at: now,
            },
        )
        .unwrap();
        (db, case_file.id)
    }

    fn draft(fact_type: &'static str, value: FactValue, excerpt: &str) -> FactDraft {
        FactDraft {
            fact_type,
            label: "Label",
            value,
            unit: None,
            currency: None,
            confidence: 0.9,
            source: SourceDraft {
                document_id: "doc-1".to_string(),
                page_number: 1,
                excerpt: excerpt.to_string(),
                locator: Locator { start: 3, end: 9 },
            },
        }
    }

    #[test]
    fn test_replace_and_list_round_trip() {
        let (db, case_id) = test_db();
        let date = NaiveDate::from_ymd_opt(1997, 11, 10).unwrap();
        let drafts = vec![
            draft("amount:eur", FactValue::Number(200000.0), "200 000 €"),
            draft("date:mentioned", FactValue::Date(date), "10/11/1997"),
            draft("company:tax", FactValue::Text("IR".to_string()), "IR article 8 CGI"),
        ];

        assert_eq!(replace_extracted(&db, &case_id, &drafts, "v1").unwrap(), 3);

        let facts = list_for_case(&db, &case_id).unwrap();
        assert_eq!(facts.len(), 3);
        assert_eq!(facts[0].value, FactValue::Number(200000.0));
        assert_eq!(facts[1].value, FactValue::Date(date));
        assert_eq!(facts[2].value, FactValue::Text("IR".to_string()));
        for fact in &facts {
            assert_eq!(fact.status, FactStatus::Extracted);
            assert_eq!(fact.sources.len(), 1);
            assert_eq!(fact.sources[0].extractor_version, "v1");
            assert_eq!(fact.sources[0].locator, Some(Locator { start: 3, end: 9 }));
        }
    }

    #[test]
    fn test_replace_keeps_human_decisions() {
        let (db, case_id) = test_db();
        let drafts = vec![
            draft("a", FactValue::Number(1.0), "one"),
            draft("b", FactValue::Number(2.0), "two"),
            draft("c", FactValue::Number(3.0), "three"),
        ];
        replace_extracted(&db, &case_id, &drafts, "v1").unwrap();

        let facts = list_for_case(&db, &case_id).unwrap();
        set_status(&db, &facts[0].id, FactStatus::Validated).unwrap();
        set_status(&db, &facts[1].id, FactStatus::Rejected).unwrap();

        replace_extracted(&db, &case_id, &drafts[2..], "v2").unwrap();

        let after = list_for_case(&db, &case_id).unwrap();
        let summary: Vec<_> = after
            .iter()
            .map(|f| (f.fact_type.as_str(), f.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a", FactStatus::Validated),
                ("b", FactStatus::Rejected),
                ("c", FactStatus::Extracted),
            ]
        );
        assert_eq!(after[2].sources[0].extractor_version, "v2");
    }

    #[test]
    fn test_excerpt_capped_on_insert() {
        let (db, case_id) = test_db();
        let long = "é".repeat(400);
        replace_extracted(&db, &case_id, &[draft("a", FactValue::Number(1.0), &long)], "v1")
            .unwrap();

        let facts = list_for_case(&db, &case_id).unwrap();
        assert_eq!(facts[0].sources[0].excerpt.chars().count(), MAX_EXCERPT_CHARS);
    }

    #[test]
    fn test_edit_validates_and_switches_value_slot() {
        let (db, case_id) = test_db();
        replace_extracted(
            &db,
            &case_id,
            &[draft("a", FactValue::Text("99/99/9999".to_string()), "x")],
            "v1",
        )
        .unwrap();
        let id = list_for_case(&db, &case_id).unwrap()[0].id.clone();

        let date = NaiveDate::from_ymd_opt(1999, 9, 9).unwrap();
        let edited = edit(
            &db,
            &id,
            &FactEdit {
                label: Some("Inscription MH (corrigée)".to_string()),
                value: Some(FactValue::Date(date)),
                unit: None,
                currency: Some(Some("EUR".to_string())),
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(edited.status, FactStatus::Validated);
        let stored = find_by_id(&db, &id).unwrap().unwrap();
        assert_eq!(stored.value, FactValue::Date(date));
        assert_eq!(stored.label, "Inscription MH (corrigée)");
        assert_eq!(stored.currency.as_deref(), Some("EUR"));
        assert_eq!(stored.status, FactStatus::Validated);
        assert_eq!(stored.sources.len(), 1);
    }

    #[test]
    fn test_edit_and_status_on_missing_fact() {
        let (db, _) = test_db();
        assert!(edit(&db, "missing", &FactEdit::default()).unwrap().is_none());
        assert!(!set_status(&db, "missing", FactStatus::Validated).unwrap());
    }
}
