use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovaggError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed {tag} record: {payload}")]
    MalformedRecord { tag: &'static str, payload: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CovaggError {
    /// Shorthand for a record-level parse failure. These are absorbed by
    /// the dispatcher (the offending record is skipped) and never abort
    /// a scan.
    pub fn malformed(tag: &'static str, payload: &str) -> Self {
        CovaggError::MalformedRecord {
            tag,
            payload: payload.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CovaggError>;
