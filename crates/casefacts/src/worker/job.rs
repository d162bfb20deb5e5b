use serde::Deserialize;

use crate::db::job_repo::{JobRow, JOB_EXTRACT_FACTS, JOB_INGEST_DOCUMENT};
use crate::error::WorkerError;

/// A claimed job, decoded from its type tag and JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    IngestDocument { document_id: String },
    ExtractFacts { case_file_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestDocumentPayload {
    #[serde(default)]
    document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractFactsPayload {
    #[serde(default)]
    case_file_id: Option<String>,
}

fn invalid(job_type: &str, reason: impl Into<String>) -> WorkerError {
    WorkerError::InvalidPayload {
        job_type: job_type.to_string(),
        reason: reason.into(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl JobKind {
    /// Decodes a job row. Unknown type tags and malformed payloads are
    /// errors; `caseFileId` falls back to the job's own case reference.
    pub fn from_job(job: &JobRow) -> Result<Self, WorkerError> {
        match job.job_type.as_str() {
            JOB_INGEST_DOCUMENT => {
                let payload: IngestDocumentPayload = serde_json::from_str(&job.payload)
                    .map_err(|e| invalid(&job.job_type, e.to_string()))?;
                let document_id = non_empty(payload.document_id)
                    .ok_or_else(|| invalid(&job.job_type, "Missing documentId"))?;
                Ok(Self::IngestDocument { document_id })
            }
            JOB_EXTRACT_FACTS => {
                let payload: ExtractFactsPayload = serde_json::from_str(&job.payload)
                    .map_err(|e| invalid(&job.job_type, e.to_string()))?;
                let case_file_id = non_empty(payload.case_file_id)
                    .or_else(|| non_empty(job.case_file_id.clone()))
                    .ok_or_else(|| invalid(&job.job_type, "Missing caseFileId"))?;
                Ok(Self::ExtractFacts { case_file_id })
            }
            other => Err(WorkerError::UnknownJobType(other.to_string())),
        }
    }
}
