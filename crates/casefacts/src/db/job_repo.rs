//! Job queue repository.
//!
//! The `jobs` table is shared by every worker process. Status changes only go
//! through the conditional updates below; each one re-checks the state it
//! expects in its `WHERE` clause and reports whether it won.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, now_timestamp, text_enum, Database, DatabaseError};
use crate::processor::text::truncate_chars;

text_enum! {
    pub enum JobStatus {
        Queued => "QUEUED",
        Running => "RUNNING",
        Done => "DONE",
        Failed => "FAILED",
    }
}

pub const JOB_INGEST_DOCUMENT: &str = "INGEST_DOCUMENT";
pub const JOB_EXTRACT_FACTS: &str = "EXTRACT_FACTS";

/// Longest error text kept on a job row.
pub const MAX_ERROR_CHARS: usize = 1000;

/// A raw job row. `job_type` and `payload` are kept as stored; they are
/// interpreted by the worker at dispatch time.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub job_type: String,
    pub payload: String,
    pub case_file_id: Option<String>,
    pub status: JobStatus,
    pub run_at: String,
    pub created_at: String,
    pub updated_at: String,
    pub locked_at: Option<String>,
    pub locked_by: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_type: row.get("job_type")?,
            payload: row.get("payload")?,
            case_file_id: row.get("case_file_id")?,
            status: row.get("status")?,
            run_at: row.get("run_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            locked_at: row.get("locked_at")?,
            locked_by: row.get("locked_by")?,
            attempts: row.get("attempts")?,
            last_error: row.get("last_error")?,
        })
    }
}

/// Queued jobs whose case has no job running. Shared by candidate selection
/// and the claim itself so both apply the same rule.
const NO_RUNNING_SIBLING: &str = "NOT EXISTS (
    SELECT 1 FROM jobs AS sibling
    WHERE sibling.status = 'RUNNING' AND sibling.case_file_id = jobs.case_file_id
)";

/// Inserts a `QUEUED` job. `run_at` defaults to now.
pub fn enqueue(
    db: &Database,
    job_type: &str,
    payload: &serde_json::Value,
    case_file_id: Option<&str>,
    run_at: Option<DateTime<Utc>>,
) -> Result<JobRow, DatabaseError> {
    let now = now_timestamp();
    let job = JobRow {
        id: uuid::Uuid::new_v4().to_string(),
        job_type: job_type.to_string(),
        payload: payload.to_string(),
        case_file_id: case_file_id.map(str::to_string),
        status: JobStatus::Queued,
        run_at: run_at.map(format_timestamp).unwrap_or_else(|| now.clone()),
        created_at: now.clone(),
        updated_at: now,
        locked_at: None,
        locked_by: None,
        attempts: 0,
        last_error: None,
    };

    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, job_type, payload, case_file_id, status, run_at,
             created_at, updated_at, attempts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
            params![
                job.id,
                job.job_type,
                job.payload,
                job.case_file_id,
                job.status,
                job.run_at,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })?;

    log::debug!("Enqueued {} job {}", job.job_type, job.id);
    Ok(job)
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Jobs of a case, oldest first.
pub fn list_for_case(db: &Database, case_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM jobs WHERE case_file_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![case_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Claims the earliest eligible job for `worker_id`.
///
/// Eligible means `QUEUED`, due (`run_at <= now`), unlocked, and no other job
/// of the same case running. The candidate is read first, then taken with a
/// conditional update that repeats the eligibility checks; if another worker
/// got there in between the update touches no row and this returns `None`.
pub fn claim_next(db: &Database, worker_id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let now = now_timestamp();

    let claimed = db.with_conn(|conn| {
        let candidate_sql = format!(
            "SELECT id FROM jobs
             WHERE status = ?1 AND run_at <= ?2 AND locked_at IS NULL AND {NO_RUNNING_SIBLING}
             ORDER BY run_at ASC, created_at ASC, rowid ASC
             LIMIT 1"
        );
        // The candidate read must be complete before the update runs, or its
        // open WAL snapshot turns a concurrent claim into SQLITE_BUSY.
        let candidate: Option<String> = conn
            .query_row(&candidate_sql, params![JobStatus::Queued, now], |r| r.get(0))
            .optional()?;
        let Some(candidate) = candidate else {
            return Ok(None);
        };

        let claim_sql = format!(
            "UPDATE jobs SET status = ?3, locked_at = ?4, locked_by = ?5,
               attempts = attempts + 1, updated_at = ?4
             WHERE id = ?1 AND status = ?2 AND locked_at IS NULL AND {NO_RUNNING_SIBLING}"
        );
        let changed = conn.execute(
            &claim_sql,
            params![candidate, JobStatus::Queued, JobStatus::Running, now, worker_id],
        )?;

        Ok((changed == 1).then_some(candidate))
    })?;

    match claimed {
        Some(id) => find_by_id(db, &id),
        None => Ok(None),
    }
}

/// Marks a job `DONE`. Returns `false` when the job is no longer running
/// under `worker_id`.
pub fn complete(db: &Database, id: &str, worker_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = ?4, locked_at = NULL, locked_by = NULL,
               last_error = NULL, updated_at = ?5
             WHERE id = ?1 AND status = ?2 AND locked_by = ?3",
            params![id, JobStatus::Running, worker_id, JobStatus::Done, now_timestamp()],
        )?;
        Ok(changed == 1)
    })
}

/// Marks a job `FAILED` with `message` cut to `MAX_ERROR_CHARS`. Returns
/// `false` when the job is no longer running under `worker_id`.
pub fn fail(db: &Database, id: &str, worker_id: &str, message: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = ?4, locked_at = NULL, locked_by = NULL,
               last_error = ?5, updated_at = ?6
             WHERE id = ?1 AND status = ?2 AND locked_by = ?3",
            params![
                id,
                JobStatus::Running,
                worker_id,
                JobStatus::Failed,
                truncate_chars(message, MAX_ERROR_CHARS),
                now_timestamp()
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Puts jobs locked for longer than `timeout` back in the queue.
///
/// Their attempt count is kept; the next claim increments it again.
pub fn reclaim_stale(db: &Database, timeout: Duration) -> Result<usize, DatabaseError> {
    let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(timeout)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    db.with_conn(|conn| {
        let reclaimed = conn.execute(
            "UPDATE jobs SET status = ?3, locked_at = NULL, locked_by = NULL,
               last_error = 'lock expired after ' || ?4 || 'ms (held by ' || locked_by || ')',
               updated_at = ?5
             WHERE status = ?1 AND locked_at IS NOT NULL AND locked_at < ?2",
            params![
                JobStatus::Running,
                format_timestamp(cutoff),
                JobStatus::Queued,
                timeout.num_milliseconds(),
                now_timestamp()
            ],
        )?;
        if reclaimed > 0 {
            log::warn!("Requeued {} job(s) with expired locks", reclaimed);
        }
        Ok(reclaimed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::case_repo::{self, CaseFileRow};
    use serde_json::json;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_case(db: &Database) -> String {
        let case_file = CaseFileRow::new("Case", None);
        case_repo::insert(db, &case_file).unwrap();
        case_file.id
    }

    fn backdate_lock(db: &Database, id: &str, minutes: i64) {
        let old = format_timestamp(Utc::now() - chrono::Duration::minutes(minutes));
        db.with_conn(|conn| {
            conn.execute("UPDATE jobs SET locked_at = ?2 WHERE id = ?1", params![id, old])?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_enqueue_and_find() {
        let db = test_db();
        let case_id = new_case(&db);
        let job = enqueue(
            &db,
            JOB_EXTRACT_FACTS,
            &json!({ "caseFileId": case_id }),
            Some(&case_id),
            None,
        )
        .unwrap();

        let found = find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Queued);
        assert_eq!(found.job_type, JOB_EXTRACT_FACTS);
        assert_eq!(found.attempts, 0);
        assert!(found.locked_at.is_none() && found.locked_by.is_none());
        let payload: serde_json::Value = serde_json::from_str(&found.payload).unwrap();
        assert_eq!(payload["caseFileId"], json!(case_id));
    }

    #[test]
    fn test_claim_sets_lock_and_counts_attempt() {
        let db = test_db();
        let job = enqueue(&db, JOB_EXTRACT_FACTS, &json!({}), None, None).unwrap();

        let claimed = claim_next(&db, "w1").unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.locked_by.as_deref(), Some("w1"));
        assert!(claimed.locked_at.is_some());
        assert_eq!(claimed.attempts, 1);

        assert!(claim_next(&db, "w2").unwrap().is_none());
    }

    #[test]
    fn test_claim_empty_queue() {
        let db = test_db();
        assert!(claim_next(&db, "w1").unwrap().is_none());
    }

    #[test]
    fn test_claim_order_is_run_at_then_created_at() {
        let db = test_db();
        let now = Utc::now();
        let later = enqueue(&db, "T", &json!({"n": 1}), None, Some(now - chrono::Duration::seconds(1)))
            .unwrap();
        let earliest = enqueue(&db, "T", &json!({"n": 2}), None, Some(now - chrono::Duration::seconds(10)))
            .unwrap();
        let tie = enqueue(&db, "T", &json!({"n": 3}), None, Some(now - chrono::Duration::seconds(1)))
            .unwrap();

        let order: Vec<_> = (0..3)
            .map(|_| {
                let job = claim_next(&db, "w").unwrap().unwrap();
                complete(&db, &job.id, "w").unwrap();
                job.id
            })
            .collect();
        assert_eq!(order, vec![earliest.id, later.id, tie.id]);
    }

    #[test]
    fn test_future_job_not_eligible() {
        let db = test_db();
        enqueue(
            &db,
            "T",
            &json!({}),
            None,
            Some(Utc::now() + chrono::Duration::hours(1)),
        )
        .unwrap();
        assert!(claim_next(&db, "w1").unwrap().is_none());
    }

    #[test]
    fn test_complete_clears_lock_and_error() {
        let db = test_db();
        enqueue(&db, "T", &json!({}), None, None).unwrap();
        let job = claim_next(&db, "w1").unwrap().unwrap();

        assert!(complete(&db, &job.id, "w1").unwrap());

        let done = find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert!(done.locked_at.is_none() && done.locked_by.is_none());
        assert!(done.last_error.is_none());
    }

    #[test]
    fn test_fail_records_truncated_error() {
        let db = test_db();
        enqueue(&db, "T", &json!({}), None, None).unwrap();
        let job = claim_next(&db, "w1").unwrap().unwrap();

        let message = "x".repeat(5000);
        assert!(fail(&db, &job.id, "w1", &message).unwrap());

        let failed = find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.locked_at.is_none() && failed.locked_by.is_none());
        assert_eq!(failed.last_error.unwrap().chars().count(), MAX_ERROR_CHARS);
    }

    #[test]
    fn test_terminal_jobs_are_never_reclaimed() {
        let db = test_db();
        enqueue(&db, "T", &json!({}), None, None).unwrap();
        let job = claim_next(&db, "w1").unwrap().unwrap();
        fail(&db, &job.id, "w1", "boom").unwrap();

        assert!(claim_next(&db, "w2").unwrap().is_none());
        assert!(!complete(&db, &job.id, "w1").unwrap());
        assert_eq!(reclaim_stale(&db, Duration::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_finish_requires_lock_owner() {
        let db = test_db();
        enqueue(&db, "T", &json!({}), None, None).unwrap();
        let job = claim_next(&db, "w1").unwrap().unwrap();

        assert!(!complete(&db, &job.id, "intruder").unwrap());
        assert!(!fail(&db, &job.id, "intruder", "nope").unwrap());
        assert_eq!(
            find_by_id(&db, &job.id).unwrap().unwrap().status,
            JobStatus::Running
        );
    }

    #[test]
    fn test_one_running_job_per_case() {
        let db = test_db();
        let case_a = new_case(&db);
        let case_b = new_case(&db);
        let a1 = enqueue(&db, "T", &json!({}), Some(&case_a), None).unwrap();
        let a2 = enqueue(&db, "T", &json!({}), Some(&case_a), None).unwrap();
        let b1 = enqueue(&db, "T", &json!({}), Some(&case_b), None).unwrap();

        assert_eq!(claim_next(&db, "w1").unwrap().unwrap().id, a1.id);
        assert_eq!(claim_next(&db, "w2").unwrap().unwrap().id, b1.id);
        assert!(claim_next(&db, "w3").unwrap().is_none());

        complete(&db, &a1.id, "w1").unwrap();
        assert_eq!(claim_next(&db, "w3").unwrap().unwrap().id, a2.id);
    }

    #[test]
    fn test_reclaim_stale_requeues_and_keeps_attempts() {
        let db = test_db();
        enqueue(&db, "T", &json!({}), None, None).unwrap();
        let job = claim_next(&db, "crashed").unwrap().unwrap();

        assert_eq!(reclaim_stale(&db, Duration::from_secs(600)).unwrap(), 0);

        backdate_lock(&db, &job.id, 30);
        assert_eq!(reclaim_stale(&db, Duration::from_secs(600)).unwrap(), 1);

        let requeued = find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(requeued.status, JobStatus::Queued);
        assert!(requeued.locked_at.is_none() && requeued.locked_by.is_none());
        assert_eq!(requeued.attempts, 1);
        assert!(requeued.last_error.unwrap().contains("crashed"));

        let again = claim_next(&db, "w2").unwrap().unwrap();
        assert_eq!(again.id, job.id);
        assert_eq!(again.attempts, 2);

        // The crashed worker can no longer finish it.
        assert!(!complete(&db, &job.id, "crashed").unwrap());
    }

    #[test]
    fn test_list_for_case() {
        let db = test_db();
        let case_id = new_case(&db);
        let first = enqueue(&db, "A", &json!({}), Some(&case_id), None).unwrap();
        let second = enqueue(&db, "B", &json!({}), Some(&case_id), None).unwrap();
        enqueue(&db, "C", &json!({}), None, None).unwrap();

        let ids: Vec<_> = list_for_case(&db, &case_id)
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
