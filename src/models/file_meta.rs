use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One file discovered by a scan. Immutable once built; a re-scan replaces
/// the whole generation. `absolute_path` is the handle later passed to the
/// move primitive; nothing else in the crate interprets it.
#[derive(Debug, Clone, Serialize)]
pub struct FileMeta {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub modified_at: DateTime<Utc>,
    /// Slash-separated path relative to the scan root.
    pub relative_path: String,
    pub content_snippet: Option<String>,
    #[serde(skip)]
    pub absolute_path: PathBuf,
}

/// Best-effort MIME guess: registry lookup by extension, then the dotted
/// extension itself, then a binary fallback.
pub fn guess_mime_type(name: &str) -> String {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match ext {
        Some(ext) => mime_guess::from_ext(&ext)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!(".{ext}")),
        None => "application/octet-stream".to_string(),
    }
}
