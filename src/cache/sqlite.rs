//! SQLite content cache implementation

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, ContentCache};
use crate::cache::{CacheEntry, ContentKind};
use crate::url::cache_key;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use url::Url;

/// SQLite-backed content cache
///
/// The connection is guarded by a mutex; cache operations are short
/// synchronous statements, so concurrent group tasks serialize briefly at
/// the lock rather than at the database. Upserts go through
/// `ON CONFLICT(url) DO UPDATE`, which replaces the whole row atomically.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

/// Aggregate counts over the cached pages, for the CLI stats mode
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: u64,
    pub entries_by_kind: HashMap<String, u64>,
}

impl SqliteCache {
    /// Opens (or creates) a cache database at the given path
    pub fn new(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Creates an in-memory cache database (for testing)
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Loads aggregate statistics over the cached pages
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let conn = self.conn.lock().unwrap();

        let total_entries: u64 =
            conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;

        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM pages GROUP BY kind")?;
        let entries_by_kind = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        Ok(CacheStats { total_entries, entries_by_kind })
    }

    fn row_to_entry(
        url: &str,
        title: String,
        preview: String,
        content: String,
        kind: String,
        scraped_at: String,
    ) -> CacheResult<CacheEntry> {
        let kind = ContentKind::from_db_string(&kind).ok_or_else(|| CacheError::Corrupt {
            url: url.to_string(),
            message: format!("unknown content kind: {}", kind),
        })?;

        let scraped_at = DateTime::parse_from_rfc3339(&scraped_at)
            .map_err(|e| CacheError::Corrupt {
                url: url.to_string(),
                message: format!("bad scraped_at timestamp: {}", e),
            })?
            .with_timezone(&Utc);

        Ok(CacheEntry { title, preview, content, kind, scraped_at })
    }
}

#[async_trait]
impl ContentCache for SqliteCache {
    async fn lookup(&self, link: &Url) -> CacheResult<Option<CacheEntry>> {
        let key = cache_key(link);
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT title, preview, content, kind, scraped_at FROM pages WHERE url = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((title, preview, content, kind, scraped_at)) => {
                let entry = Self::row_to_entry(&key, title, preview, content, kind, scraped_at)?;
                if entry.is_placeholder() {
                    Ok(None)
                } else {
                    Ok(Some(entry))
                }
            }
            None => Ok(None),
        }
    }

    async fn store(&self, link: &Url, entry: &CacheEntry) -> CacheResult<()> {
        let key = cache_key(link);
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO pages (url, title, preview, content, kind, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(url) DO UPDATE SET
                 title = excluded.title,
                 preview = excluded.preview,
                 content = excluded.content,
                 kind = excluded.kind,
                 scraped_at = excluded.scraped_at",
            params![
                key,
                entry.title,
                entry.preview,
                entry.content,
                entry.kind.to_db_string(),
                entry.scraped_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }
}
