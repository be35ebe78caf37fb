use rusqlite::Connection;

use crate::data::repository::{self, PermissionScope};
use crate::error::AppError;

/// Setting key holding the fallback mode for paths no scope covers.
const DEFAULT_MODE_KEY: &str = "permission_default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    Deny,
    Ask,
    Allow,
}

impl PermissionMode {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "deny" => Ok(Self::Deny),
            "ask" => Ok(Self::Ask),
            "allow" => Ok(Self::Allow),
            other => Err(AppError::General(format!(
                "invalid permission mode '{other}' (expected: deny|ask|allow)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Ask => "ask",
            Self::Allow => "allow",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PermissionEvaluation {
    pub path: String,
    pub mode: PermissionMode,
    pub scope_path: Option<String>,
}

fn normalize_path(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    while p.ends_with('/') && p.len() > 1 {
        p.pop();
    }
    p
}

fn scope_matches_path(path: &str, scope: &str) -> bool {
    let path = normalize_path(path);
    let scope = normalize_path(scope);
    if scope == "/" {
        return path.starts_with('/');
    }
    path == scope || path.starts_with(&(scope + "/"))
}

pub fn resolve_default_mode(conn: &Connection) -> Result<PermissionMode, AppError> {
    match repository::get_setting(conn, DEFAULT_MODE_KEY)? {
        Some(value) => PermissionMode::parse(&value),
        None => Ok(PermissionMode::Ask),
    }
}

pub fn set_default_mode(conn: &Connection, mode: PermissionMode) -> Result<(), AppError> {
    repository::set_setting(conn, DEFAULT_MODE_KEY, mode.as_str())
}

/// Most specific matching scope wins; no match falls back to the default.
pub fn evaluate_with_scopes(
    scopes: &[PermissionScope],
    path: &str,
    default_mode: PermissionMode,
) -> Result<PermissionEvaluation, AppError> {
    let mut best: Option<&PermissionScope> = None;
    for scope in scopes {
        if scope_matches_path(path, &scope.directory_path) {
            let is_more_specific = best
                .map(|current| scope.directory_path.len() > current.directory_path.len())
                .unwrap_or(true);
            if is_more_specific {
                best = Some(scope);
            }
        }
    }

    match best {
        Some(scope) => Ok(PermissionEvaluation {
            path: path.to_string(),
            mode: PermissionMode::parse(&scope.mode)?,
            scope_path: Some(scope.directory_path.clone()),
        }),
        None => Ok(PermissionEvaluation {
            path: path.to_string(),
            mode: default_mode,
            scope_path: None,
        }),
    }
}

pub fn evaluate(conn: &Connection, path: &str) -> Result<PermissionEvaluation, AppError> {
    let scopes = repository::get_permission_scopes(conn)?;
    let default_mode = resolve_default_mode(conn)?;
    evaluate_with_scopes(&scopes, path, default_mode)
}

/// Gate a read-write operation on `path`. `allow_once` satisfies ask-mode
/// for this call only; deny always fails.
pub fn enforce_with_scopes(
    scopes: &[PermissionScope],
    path: &str,
    default_mode: PermissionMode,
    allow_once: bool,
) -> Result<(), AppError> {
    let evaluation = evaluate_with_scopes(scopes, path, default_mode)?;
    match evaluation.mode {
        PermissionMode::Allow => Ok(()),
        PermissionMode::Deny => Err(AppError::PermissionDenied(path.to_string())),
        PermissionMode::Ask => {
            if allow_once {
                Ok(())
            } else {
                Err(AppError::PermissionDenied(format!(
                    "{path} (confirmation required; grant the folder or pass --allow)"
                )))
            }
        }
    }
}

pub fn enforce(conn: &Connection, path: &str, allow_once: bool) -> Result<(), AppError> {
    let scopes = repository::get_permission_scopes(conn)?;
    let default_mode = resolve_default_mode(conn)?;
    enforce_with_scopes(&scopes, path, default_mode, allow_once)
}

pub fn grant(conn: &Connection, path: &str) -> Result<(), AppError> {
    repository::upsert_permission_scope(conn, &normalize_path(path), PermissionMode::Allow.as_str())
}

pub fn revoke(conn: &Connection, path: &str) -> Result<bool, AppError> {
    Ok(repository::remove_permission_scope(conn, &normalize_path(path))? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations;

    fn scope(path: &str, mode: &str) -> PermissionScope {
        PermissionScope {
            directory_path: path.to_string(),
            mode: mode.to_string(),
        }
    }

    #[test]
    fn test_scope_match_is_prefix_on_segments_not_bytes() {
        assert!(scope_matches_path("/home/u/docs/tax", "/home/u/docs"));
        assert!(scope_matches_path("/home/u/docs", "/home/u/docs"));
        assert!(!scope_matches_path("/home/u/docs-old", "/home/u/docs"));
    }

    #[test]
    fn test_most_specific_scope_wins() {
        let scopes = vec![scope("/home/u", "deny"), scope("/home/u/docs", "allow")];
        let evaluation =
            evaluate_with_scopes(&scopes, "/home/u/docs/2024", PermissionMode::Ask).unwrap();
        assert_eq!(evaluation.mode, PermissionMode::Allow);
        assert_eq!(evaluation.scope_path.as_deref(), Some("/home/u/docs"));
    }

    #[test]
    fn test_unscoped_path_uses_default_mode() {
        let evaluation = evaluate_with_scopes(&[], "/tmp/x", PermissionMode::Deny).unwrap();
        assert_eq!(evaluation.mode, PermissionMode::Deny);
        assert!(evaluation.scope_path.is_none());
    }

    #[test]
    fn test_enforce_ask_requires_allow_once() {
        let scopes = vec![scope("/home/u", "ask")];
        assert!(enforce_with_scopes(&scopes, "/home/u/x", PermissionMode::Deny, false).is_err());
        assert!(enforce_with_scopes(&scopes, "/home/u/x", PermissionMode::Deny, true).is_ok());
    }

    #[test]
    fn test_enforce_deny_ignores_allow_once() {
        let scopes = vec![scope("/home/u", "deny")];
        let result = enforce_with_scopes(&scopes, "/home/u/x", PermissionMode::Allow, true);
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[test]
    fn test_grant_persists_and_revoke_removes() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();

        grant(&conn, "/home/u/docs/").unwrap();
        assert!(enforce(&conn, "/home/u/docs/sub", false).is_ok());

        assert!(revoke(&conn, "/home/u/docs").unwrap());
        assert!(enforce(&conn, "/home/u/docs/sub", false).is_err());
    }
}
