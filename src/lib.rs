pub mod cli;
pub mod data;
pub mod error;
pub mod models;
pub mod services;

use std::path::PathBuf;

use error::AppError;

/// Open (and migrate) the app database under the user's local data
/// directory.
pub fn init_db() -> Result<(rusqlite::Connection, PathBuf), AppError> {
    let base = dirs::data_local_dir()
        .ok_or_else(|| AppError::General("could not resolve a local data directory".to_string()))?;
    let app_dir = base.join("neatstep");
    std::fs::create_dir_all(&app_dir)?;
    let db_path = app_dir.join("neatstep.db");
    let conn = open_db_at(&db_path)?;
    Ok((conn, db_path))
}

pub fn open_db_at(db_path: &std::path::Path) -> Result<rusqlite::Connection, AppError> {
    let conn = rusqlite::Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    data::migrations::run_migrations(&conn)?;
    Ok(conn)
}
