//! SQLite schema for the content cache and job records

use rusqlite::Connection;

/// Creates all tables and indexes if they do not exist
///
/// Shared by the content cache and the job store; both may open their own
/// connection against the same database file, so every statement is
/// idempotent.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            url        TEXT PRIMARY KEY,
            title      TEXT NOT NULL,
            preview    TEXT NOT NULL,
            content    TEXT NOT NULL,
            kind       TEXT NOT NULL,
            scraped_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pages_kind ON pages(kind);

        CREATE TABLE IF NOT EXISTS jobs (
            id         TEXT PRIMARY KEY,
            url        TEXT NOT NULL,
            status     TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            result     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
        ",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('pages', 'jobs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
    }
}
