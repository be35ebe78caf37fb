#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Permission to access the folder was denied: {0}")]
    PermissionDenied(String),

    #[error("Analysis failed: the classification service returned an error or a malformed response. Try again.")]
    Classification,

    #[error("This environment does not support atomic file relocation for {0}")]
    MoveNotSupported(String),

    #[error("{0}")]
    General(String),
}
