//! Database schema definitions

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Configured crawl targets
CREATE TABLE IF NOT EXISTS domains (
    key TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    delay_ms INTEGER NOT NULL,
    position INTEGER NOT NULL
);

-- Seed URLs per domain, in reseed order
CREATE TABLE IF NOT EXISTS start_points (
    domain TEXT NOT NULL REFERENCES domains(key) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    PRIMARY KEY (domain, position)
);

-- Page records keyed by URL
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    domain TEXT,
    state TEXT NOT NULL,
    title TEXT,
    status_code INTEGER,
    content_type TEXT,
    error_message TEXT,
    visit_count INTEGER NOT NULL DEFAULT 0,
    last_visited TEXT,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_domain ON pages(domain);
CREATE INDEX IF NOT EXISTS idx_pages_state ON pages(state);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
