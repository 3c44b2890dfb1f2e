//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::state::{DomainPolicy, PageState};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::Page;
use crate::url::domain_key;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<(Page, String, Option<String>)> {
    let state: String = row.get(1)?;
    let last_visited: Option<String> = row.get(7)?;
    let page = Page {
        url: row.get(0)?,
        state: PageState::Discovered,
        title: row.get(2)?,
        status_code: row.get(3)?,
        content_type: row.get(4)?,
        error_message: row.get(5)?,
        visit_count: row.get(6)?,
        last_visited: None,
    };
    Ok((page, state, last_visited))
}

impl PageStore for SqliteStorage {
    // ===== Domain Policies =====

    fn load_domains(&self) -> StorageResult<Vec<DomainPolicy>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT key, url, delay_ms FROM domains ORDER BY position ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut points_stmt =
            conn.prepare("SELECT url FROM start_points WHERE domain = ?1 ORDER BY position ASC")?;

        let mut domains = Vec::with_capacity(rows.len());
        for (key, url, delay_ms) in rows {
            let start_points = points_stmt
                .query_map(params![key], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            let delay_ms = u64::try_from(delay_ms).map_err(|_| {
                StorageError::Corrupt(format!("negative delay {} for {}", delay_ms, key))
            })?;

            let policy = DomainPolicy::new(url, Duration::from_millis(delay_ms), start_points)
                .map_err(|e| StorageError::Corrupt(format!("domain {}: {}", key, e)))?;
            domains.push(policy);
        }

        Ok(domains)
    }

    fn save_domains(&self, domains: &[DomainPolicy]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM start_points", [])?;
        tx.execute("DELETE FROM domains", [])?;

        for (position, policy) in domains.iter().enumerate() {
            let delay_ms = i64::try_from(policy.delay().as_millis()).unwrap_or(i64::MAX);
            tx.execute(
                "INSERT INTO domains (key, url, delay_ms, position) VALUES (?1, ?2, ?3, ?4)",
                params![policy.key(), policy.url(), delay_ms, position as i64],
            )?;

            for (point_position, url) in policy.start_points().iter().enumerate() {
                tx.execute(
                    "INSERT INTO start_points (domain, position, url) VALUES (?1, ?2, ?3)",
                    params![policy.key(), point_position as i64, url],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    // ===== Page Management =====

    fn get_page(&self, url: &str) -> StorageResult<Page> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT url, state, title, status_code, content_type, error_message,
                 visit_count, last_visited
                 FROM pages WHERE url = ?1",
                params![url],
                page_from_row,
            )
            .optional()?;

        let (mut page, state, last_visited) =
            row.ok_or_else(|| StorageError::PageNotFound(url.to_string()))?;

        page.state = PageState::from_db_string(&state)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown page state '{}'", state)))?;
        page.last_visited = last_visited
            .map(|s| s.parse::<DateTime<Utc>>())
            .transpose()
            .map_err(|e| StorageError::Corrupt(format!("last_visited for {}: {}", url, e)))?;

        Ok(page)
    }

    fn save_page(&self, page: &Page) -> StorageResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let domain = domain_key(&page.url).ok();

        conn.execute(
            "INSERT INTO pages (url, domain, state, title, status_code, content_type,
             error_message, visit_count, last_visited, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(url) DO UPDATE SET
                domain = excluded.domain,
                state = excluded.state,
                title = excluded.title,
                status_code = excluded.status_code,
                content_type = excluded.content_type,
                error_message = excluded.error_message,
                visit_count = excluded.visit_count,
                last_visited = excluded.last_visited,
                updated_at = excluded.updated_at",
            params![
                page.url,
                domain,
                page.state.to_db_string(),
                page.title,
                page.status_code,
                page.content_type,
                page.error_message,
                page.visit_count,
                page.last_visited.map(|t| t.to_rfc3339()),
                now,
            ],
        )?;

        Ok(())
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pages_by_domain(&self) -> StorageResult<HashMap<String, u64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT domain, COUNT(*) FROM pages WHERE domain IS NOT NULL GROUP BY domain",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (domain, count) = row?;
            counts.insert(domain, count as u64);
        }

        Ok(counts)
    }
}
