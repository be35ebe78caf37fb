use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::data::repository::PermissionScope;
use crate::error::AppError;
use crate::models::file_meta::{guess_mime_type, FileMeta};
use crate::services::permission_service::{self, PermissionMode};

/// Extensions worth reading a snippet from; anything else is only sampled
/// when its guessed MIME type is text/*.
pub const SUPPORTED_TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".json", ".js", ".ts", ".py", ".csv", ".html", ".css", ".tsx", ".jsx", ".yaml",
    ".yml",
];

const SNIPPET_READ_BYTES: u64 = 500;
const SNIPPET_MAX_CHARS: usize = 200;
const UNREADABLE_SNIPPET: &str = "Analysis restricted: content unreadable.";

#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<FileMeta>,
    /// Entries (files or whole subtrees) the walk could not read. They
    /// contribute nothing; the scan itself still succeeds.
    pub skipped_entries: usize,
}

impl ScanResult {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Walk every file reachable from `root`. The read-write grant is checked
/// once, at the root; a denial aborts before any traversal.
pub fn scan(
    root: &Path,
    scopes: &[PermissionScope],
    default_mode: PermissionMode,
    allow_once: bool,
) -> Result<ScanResult, AppError> {
    if !root.is_dir() {
        return Err(AppError::General(format!(
            "scan root is not a directory: {}",
            root.display()
        )));
    }
    permission_service::enforce_with_scopes(
        scopes,
        &root.to_string_lossy(),
        default_mode,
        allow_once,
    )?;

    let mut result = ScanResult::default();

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!(
                    "access limitation at {:?}: {e}",
                    e.path().unwrap_or(root)
                );
                result.skipped_entries += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match file_meta_for(root, entry.path()) {
            Some(meta) => result.files.push(meta),
            None => result.skipped_entries += 1,
        }
    }

    Ok(result)
}

fn file_meta_for(root: &Path, path: &Path) -> Option<FileMeta> {
    let metadata = match path.metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            log::warn!("skipping unreadable entry {}: {e}", path.display());
            return None;
        }
    };

    let name = path.file_name()?.to_string_lossy().to_string();
    let relative_path = path
        .strip_prefix(root)
        .ok()?
        .to_string_lossy()
        .replace('\\', "/");
    let mime_type = guess_mime_type(&name);
    let modified_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let content_snippet = if should_sample(&name, &mime_type) {
        Some(read_snippet(path))
    } else {
        None
    };

    Some(FileMeta {
        name,
        size_bytes: metadata.len(),
        mime_type,
        modified_at,
        relative_path,
        content_snippet,
        absolute_path: path.to_path_buf(),
    })
}

fn should_sample(name: &str, mime_type: &str) -> bool {
    let ext = Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()));
    let listed = ext
        .as_deref()
        .map(|ext| SUPPORTED_TEXT_EXTENSIONS.contains(&ext))
        .unwrap_or(false);
    listed || mime_type.starts_with("text/")
}

/// First 500 bytes, newlines collapsed to spaces, capped at 200 chars. A
/// read failure yields a sentinel instead of aborting the scan.
fn read_snippet(path: &Path) -> String {
    let mut buf = Vec::new();
    let read = File::open(path)
        .and_then(|file| file.take(SNIPPET_READ_BYTES).read_to_end(&mut buf));
    if read.is_err() {
        return UNREADABLE_SNIPPET.to_string();
    }

    String::from_utf8_lossy(&buf)
        .replace(['\n', '\r'], " ")
        .chars()
        .take(SNIPPET_MAX_CHARS)
        .collect()
}
