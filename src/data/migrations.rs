use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS activity_log (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    action TEXT NOT NULL,
    details TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_time ON activity_log(timestamp DESC);

CREATE TABLE IF NOT EXISTS app_stats (
    id TEXT PRIMARY KEY,
    files_analyzed INTEGER NOT NULL DEFAULT 0,
    junk_found INTEGER NOT NULL DEFAULT 0,
    space_analyzed INTEGER NOT NULL DEFAULT 0,
    folders_created INTEGER NOT NULL DEFAULT 0,
    ai_insights TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS permission_scopes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    directory_path TEXT UNIQUE NOT NULL,
    mode TEXT NOT NULL DEFAULT 'ask',
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

pub fn run_migrations(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA_V1)?;
    Ok(())
}
