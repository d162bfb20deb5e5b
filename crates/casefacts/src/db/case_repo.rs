//! Case file repository. A case file owns documents, facts and jobs.

use rusqlite::{params, Row};

use super::{now_timestamp, Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct CaseFileRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl CaseFileRow {
    pub fn new(name: &str, description: Option<&str>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now_timestamp(),
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn insert(db: &Database, case_file: &CaseFileRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO case_files (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                case_file.id,
                case_file.name,
                case_file.description,
                case_file.created_at
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<CaseFileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM case_files WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], CaseFileRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
