use thiserror::Error;

/// Errors emitted while loading the session history.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("not signed in or session expired")]
    Unauthenticated,
    #[error("history request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("history payload is not a list of sessions: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HistoryError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, HistoryError::Unauthenticated)
    }
}

/// Errors emitted by the CSV exporter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("exported CSV is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
