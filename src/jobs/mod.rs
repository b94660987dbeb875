//! Persistent job records for extraction sessions
//!
//! Each CLI run wraps its session in a job record so past extractions and
//! their outcomes can be inspected later. The core never depends on this
//! module; the job lifecycle belongs to the caller.

use crate::cache::initialize_schema;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur during job store operations
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for job store operations
pub type JobResult<T> = Result<T, JobError>;

/// Lifecycle status of an extraction job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One extraction job
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: String,
    pub url: String,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,

    /// Aggregate session result, recorded when the job finishes
    pub result: Option<serde_json::Value>,
}

/// SQLite-backed job store
///
/// Shares the database file with the content cache; opens its own
/// connection so the two never contend on one handle.
pub struct JobStore {
    conn: Mutex<Connection>,
}

impl JobStore {
    /// Opens (or creates) the job store at the given database path
    pub fn new(path: &Path) -> JobResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Creates an in-memory job store (for testing)
    pub fn new_in_memory() -> JobResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Creates a new pending job for a seed URL and returns its id
    pub fn create(&self, url: &str) -> JobResult<String> {
        use std::sync::atomic::{AtomicU64, Ordering};
        // Timestamp alone can collide when jobs are created in the same
        // millisecond; a process-local counter keeps ids unique
        static SEQ: AtomicU64 = AtomicU64::new(0);

        let id = format!(
            "job_{}_{}",
            Utc::now().timestamp_millis(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs (id, url, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, url, JobStatus::Pending.to_db_string(), now],
        )?;

        Ok(id)
    }

    /// Marks a job finished with the given status and aggregate result
    pub fn finalize(
        &self,
        id: &str,
        status: JobStatus,
        result: Option<&serde_json::Value>,
    ) -> JobResult<()> {
        let now = Utc::now().to_rfc3339();
        let result_text = result.map(serde_json::to_string).transpose()?;

        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE jobs SET status = ?1, updated_at = ?2, result = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, result_text, id],
        )?;

        if updated == 0 {
            return Err(JobError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Gets a job by id
    pub fn get(&self, id: &str) -> JobResult<JobRecord> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, url, status, created_at, updated_at, result FROM jobs WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| JobError::NotFound(id.to_string()))
        .and_then(|(id, url, status, created_at, updated_at, result)| {
            let status = JobStatus::from_db_string(&status).unwrap_or(JobStatus::Failed);
            let result = result.map(|s| serde_json::from_str(&s)).transpose()?;
            Ok(JobRecord { id, url, status, created_at, updated_at, result })
        })
    }

    /// Counts jobs by status
    pub fn count_by_status(&self, status: JobStatus) -> JobResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_roundtrip() {
        for status in [JobStatus::Pending, JobStatus::Completed, JobStatus::Failed] {
            assert_eq!(JobStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(JobStatus::from_db_string("bogus"), None);
    }

    #[test]
    fn test_create_and_get() {
        let store = JobStore::new_in_memory().unwrap();
        let id = store.create("https://ex.com/").unwrap();

        let job = store.get(&id).unwrap();
        assert_eq!(job.url, "https://ex.com/");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
    }

    #[test]
    fn test_finalize_completed_with_result() {
        let store = JobStore::new_in_memory().unwrap();
        let id = store.create("https://ex.com/").unwrap();

        let summary = serde_json::json!({ "groups": 3, "links": 12 });
        store.finalize(&id, JobStatus::Completed, Some(&summary)).unwrap();

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(summary));
    }

    #[test]
    fn test_finalize_missing_job() {
        let store = JobStore::new_in_memory().unwrap();
        let err = store.finalize("job_0", JobStatus::Failed, None);
        assert!(matches!(err, Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_count_by_status() {
        let store = JobStore::new_in_memory().unwrap();
        let a = store.create("https://ex.com/a").unwrap();
        let _b = store.create("https://ex.com/b").unwrap();

        store.finalize(&a, JobStatus::Completed, None).unwrap();

        assert_eq!(store.count_by_status(JobStatus::Pending).unwrap(), 1);
        assert_eq!(store.count_by_status(JobStatus::Completed).unwrap(), 1);
    }
}
