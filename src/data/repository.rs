use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::activity::{ActivityLogEntry, AppStats};

/// Fixed row key for the single cumulative stats record.
const STATS_KEY: &str = "main_stats";

// ---------------------------------------------------------------------------
// Activity log. Fail-soft: a broken audit trail must never break the
// operation being audited.
// ---------------------------------------------------------------------------

pub fn append_log(conn: &Connection, entry: &ActivityLogEntry) {
    if let Err(e) = try_append_log(conn, entry) {
        log::warn!("activity log append failed: {e}");
    }
}

fn try_append_log(conn: &Connection, entry: &ActivityLogEntry) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO activity_log (id, timestamp, action, details, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id.to_string(),
            entry.timestamp,
            entry.action.to_string(),
            entry.details,
            entry.status.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_all_logs(conn: &Connection) -> Vec<ActivityLogEntry> {
    match try_get_all_logs(conn) {
        Ok(logs) => logs,
        Err(e) => {
            log::warn!("activity log retrieval failed: {e}");
            Vec::new()
        }
    }
}

fn try_get_all_logs(conn: &Connection) -> Result<Vec<ActivityLogEntry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, action, details, status
         FROM activity_log ORDER BY timestamp DESC, id DESC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let timestamp: DateTime<Utc> = row.get(1)?;
            let action: String = row.get(2)?;
            let status: String = row.get(4)?;
            Ok((id, timestamp, action, row.get::<_, String>(3)?, status))
        })?
        .filter_map(|r| r.ok())
        .filter_map(|(id, timestamp, action, details, status)| {
            Some(ActivityLogEntry {
                id: Uuid::parse_str(&id).ok()?,
                timestamp,
                action: action.parse().ok()?,
                details,
                status: status.parse().ok()?,
            })
        })
        .collect();

    Ok(entries)
}

pub fn clear_logs(conn: &Connection) {
    if let Err(e) = conn.execute("DELETE FROM activity_log", []) {
        log::warn!("activity log wipe failed: {e}");
    }
}

// ---------------------------------------------------------------------------
// Stats: single fixed-key row, upserted on every mutation.
// ---------------------------------------------------------------------------

pub fn get_stats(conn: &Connection) -> AppStats {
    match try_get_stats(conn) {
        Ok(Some(stats)) => stats,
        Ok(None) => AppStats::default(),
        Err(e) => {
            log::warn!("stats retrieval failed: {e}");
            AppStats::default()
        }
    }
}

fn try_get_stats(conn: &Connection) -> Result<Option<AppStats>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT files_analyzed, junk_found, space_analyzed, folders_created, ai_insights
         FROM app_stats WHERE id = ?1",
    )?;

    let row = stmt
        .query_row(params![STATS_KEY], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .optional()?;

    Ok(row.map(
        |(files_analyzed, junk_found, space_analyzed, folders_created, insights)| AppStats {
            files_analyzed: files_analyzed.max(0) as u64,
            junk_found: junk_found.max(0) as u64,
            space_analyzed: space_analyzed.max(0) as u64,
            folders_created: folders_created.max(0) as u64,
            ai_insights: serde_json::from_str(&insights).unwrap_or_default(),
        },
    ))
}

pub fn put_stats(conn: &Connection, stats: &AppStats) {
    if let Err(e) = try_put_stats(conn, stats) {
        log::warn!("stats persistence failed: {e}");
    }
}

fn try_put_stats(conn: &Connection, stats: &AppStats) -> Result<(), AppError> {
    let insights = serde_json::to_string(&stats.ai_insights)?;
    conn.execute(
        "INSERT OR REPLACE INTO app_stats
             (id, files_analyzed, junk_found, space_analyzed, folders_created, ai_insights)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            STATS_KEY,
            stats.files_analyzed as i64,
            stats.junk_found as i64,
            stats.space_analyzed as i64,
            stats.folders_created as i64,
            insights,
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings: plain key/value config; errors propagate.
// ---------------------------------------------------------------------------

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
    let value = stmt
        .query_row(params![key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Permission scopes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PermissionScope {
    pub directory_path: String,
    pub mode: String,
}

pub fn get_permission_scopes(conn: &Connection) -> Result<Vec<PermissionScope>, AppError> {
    let mut stmt =
        conn.prepare("SELECT directory_path, mode FROM permission_scopes ORDER BY directory_path")?;
    let scopes = stmt
        .query_map([], |row| {
            Ok(PermissionScope {
                directory_path: row.get(0)?,
                mode: row.get(1)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(scopes)
}

pub fn upsert_permission_scope(
    conn: &Connection,
    directory_path: &str,
    mode: &str,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO permission_scopes (directory_path, mode) VALUES (?1, ?2)
         ON CONFLICT(directory_path) DO UPDATE SET mode = excluded.mode",
        params![directory_path, mode],
    )?;
    Ok(())
}

pub fn remove_permission_scope(conn: &Connection, directory_path: &str) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM permission_scopes WHERE directory_path = ?1",
        params![directory_path],
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations;
    use crate::models::activity::{ActionKind, ActionStatus};
    use chrono::Duration;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_logs_come_back_newest_first() {
        let conn = test_conn();

        let mut older = ActivityLogEntry::new(ActionKind::Scan, "first", ActionStatus::Success);
        older.timestamp = Utc::now() - Duration::seconds(60);
        let newer = ActivityLogEntry::new(ActionKind::Move, "second", ActionStatus::Success);

        append_log(&conn, &older);
        append_log(&conn, &newer);

        let logs = get_all_logs(&conn);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].details, "second");
        assert_eq!(logs[1].details, "first");
    }

    #[test]
    fn test_clear_logs_empties_the_table() {
        let conn = test_conn();
        append_log(
            &conn,
            &ActivityLogEntry::new(ActionKind::Scan, "x", ActionStatus::Success),
        );
        clear_logs(&conn);
        assert!(get_all_logs(&conn).is_empty());
    }

    #[test]
    fn test_stats_default_when_absent_then_round_trip() {
        let conn = test_conn();
        let initial = get_stats(&conn);
        assert_eq!(initial.files_analyzed, 0);

        let stats = AppStats {
            files_analyzed: 7,
            junk_found: 2,
            space_analyzed: 4_096,
            folders_created: 3,
            ai_insights: Vec::new(),
        };
        put_stats(&conn, &stats);
        put_stats(&conn, &stats); // fixed key: second write overwrites, no dup row

        let loaded = get_stats(&conn);
        assert_eq!(loaded.files_analyzed, 7);
        assert_eq!(loaded.space_analyzed, 4_096);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM app_stats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_settings_round_trip() {
        let conn = test_conn();
        assert!(get_setting(&conn, "model").unwrap().is_none());
        set_setting(&conn, "model", "gemini-3-flash-preview").unwrap();
        set_setting(&conn, "model", "gemini-3-pro").unwrap();
        assert_eq!(
            get_setting(&conn, "model").unwrap().as_deref(),
            Some("gemini-3-pro")
        );
    }

    #[test]
    fn test_permission_scope_upsert_and_remove() {
        let conn = test_conn();
        upsert_permission_scope(&conn, "/home/u/docs", "allow").unwrap();
        upsert_permission_scope(&conn, "/home/u/docs", "deny").unwrap();

        let scopes = get_permission_scopes(&conn).unwrap();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].mode, "deny");

        assert_eq!(remove_permission_scope(&conn, "/home/u/docs").unwrap(), 1);
        assert!(get_permission_scopes(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_fail_soft_log_ops_do_not_panic_without_schema() {
        // No migrations: every statement fails, and the fail-soft wrappers
        // must swallow that.
        let conn = Connection::open_in_memory().unwrap();
        append_log(
            &conn,
            &ActivityLogEntry::new(ActionKind::Scan, "x", ActionStatus::Success),
        );
        assert!(get_all_logs(&conn).is_empty());
        clear_logs(&conn);
        assert_eq!(get_stats(&conn).files_analyzed, 0);
        put_stats(&conn, &AppStats::default());
    }
}
