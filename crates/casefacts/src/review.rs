//! Human review of extracted facts.
//!
//! A reviewed fact (`validated` or `rejected`) is out of reach of later
//! extraction runs, which only replace `extracted` facts.

use crate::db::fact_repo::{self, FactEdit, FactRow, FactStatus};
use crate::db::Database;
use crate::error::{CasefactsError, Result};

fn not_found(id: &str) -> CasefactsError {
    CasefactsError::NotFound {
        kind: "Fact",
        id: id.to_string(),
    }
}

pub fn validate_fact(db: &Database, fact_id: &str) -> Result<()> {
    if !fact_repo::set_status(db, fact_id, FactStatus::Validated)? {
        return Err(not_found(fact_id));
    }
    Ok(())
}

pub fn reject_fact(db: &Database, fact_id: &str) -> Result<()> {
    if !fact_repo::set_status(db, fact_id, FactStatus::Rejected)? {
        return Err(not_found(fact_id));
    }
    Ok(())
}

/// Corrects a fact. An edited fact counts as validated.
pub fn edit_fact(db: &Database, fact_id: &str, changes: &FactEdit) -> Result<FactRow> {
    fact_repo::edit(db, fact_id, changes)?.ok_or_else(|| not_found(fact_id))
}

pub fn list_facts(db: &Database, case_id: &str) -> Result<Vec<FactRow>> {
    Ok(fact_repo::list_for_case(db, case_id)?)
}
