use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::models::activity::{ActionKind, ActionStatus, ActivityLogEntry, ExecutionSummary};
use crate::models::analysis::FileAnalysis;
use crate::models::file_meta::FileMeta;

/// Apply the accepted actions, strictly one file at a time. Per-item
/// failures are logged through `log_action` and never abort the batch; the
/// caller re-scans once the whole list has been processed.
pub fn apply(
    root: &Path,
    files: &[FileMeta],
    selected: &[FileAnalysis],
    log_action: &mut dyn FnMut(ActivityLogEntry),
) -> ExecutionSummary {
    let mut summary = ExecutionSummary::default();
    let mut folders_touched: HashSet<String> = HashSet::new();

    for item in selected {
        let source = files.iter().find(|f| f.name == item.original_name);
        let Some(source) = source else {
            // The file disappeared or was renamed since the scan; there is
            // no handle to move.
            log_action(ActivityLogEntry::new(
                ActionKind::Move,
                format!(
                    "Relocation failed for {}: no longer present in the scanned folder",
                    item.original_name
                ),
                ActionStatus::Failed,
            ));
            summary.failed += 1;
            continue;
        };

        match organize_file(root, source, item) {
            Ok(()) => {
                summary.files_moved += 1;
                if item.is_junk {
                    summary.junk_moved += 1;
                }
                if let Some(folder) = non_root_folder(&item.suggested_folder) {
                    folders_touched.insert(folder);
                }
                let target = non_root_folder(&item.suggested_folder)
                    .map(|folder| format!("{folder}/"))
                    .unwrap_or_default();
                log_action(ActivityLogEntry::new(
                    ActionKind::Move,
                    format!(
                        "Relocated {} -> {target}{}",
                        item.original_name, item.suggested_name
                    ),
                    ActionStatus::Success,
                ));
            }
            Err(e) => {
                summary.failed += 1;
                log_action(ActivityLogEntry::new(
                    ActionKind::Move,
                    format!("Relocation failed for {}: {e}", item.original_name),
                    ActionStatus::Failed,
                ));
            }
        }
    }

    summary.folders_created = folders_touched.len() as u64;
    summary
}

/// Move one file into its suggested folder under `root`, creating the
/// folder path as needed, and rename it in the same step.
pub fn organize_file(root: &Path, source: &FileMeta, item: &FileAnalysis) -> Result<(), AppError> {
    let new_name = validate_new_name(&item.suggested_name, &source.name)?;
    let target_dir = resolve_target_dir(root, &item.suggested_folder)?;
    let destination = target_dir.join(&new_name);

    if destination == source.absolute_path {
        return Ok(());
    }
    if destination.exists() {
        return Err(AppError::General(format!(
            "destination already exists: {}",
            destination.display()
        )));
    }

    fs::rename(&source.absolute_path, &destination).map_err(|e| {
        if e.kind() == ErrorKind::CrossesDevices {
            AppError::MoveNotSupported(source.name.clone())
        } else {
            AppError::Io(e)
        }
    })
}

/// Split a suggested folder into segments and create them under the root.
/// "." , "/" and empty mean the root itself; creation is idempotent.
fn resolve_target_dir(root: &Path, suggested_folder: &str) -> Result<PathBuf, AppError> {
    let mut dir = root.to_path_buf();
    for segment in folder_segments(suggested_folder) {
        dir.push(segment);
    }
    if dir != root {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

fn folder_segments(suggested_folder: &str) -> impl Iterator<Item = &str> {
    suggested_folder
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
}

fn non_root_folder(suggested_folder: &str) -> Option<String> {
    let segments: Vec<&str> = folder_segments(suggested_folder).collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// A usable file name: no separators, no traversal, not hidden. Falls back
/// to the source name rather than failing when the suggestion is empty.
fn validate_new_name(suggested: &str, original: &str) -> Result<String, AppError> {
    let trimmed = suggested.trim();
    if trimmed.is_empty() || trimmed == original {
        return Ok(original.to_string());
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") || trimmed.starts_with('.') {
        return Err(AppError::General(format!(
            "unsafe suggested name: {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Bottom-up sweep of directories left empty by the moves. The root itself
/// is kept. An unreadable directory is treated as non-empty.
pub fn remove_empty_dirs(root: &Path) -> usize {
    fn sweep(dir: &Path, removed: &mut usize) -> bool {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cleanup skipped unreadable directory {}: {e}", dir.display());
                return false;
            }
        };

        let mut has_content = false;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && sweep(&path, removed) && fs::remove_dir(&path).is_ok() {
                *removed += 1;
            } else {
                has_content = true;
            }
        }
        !has_content
    }

    let mut removed = 0;
    sweep(root, &mut removed);
    removed
}
