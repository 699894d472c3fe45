use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum AcademyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Unknown student: {0}")]
    UnknownStudent(String),

    #[error("Unknown {collection} record: {id}")]
    UnknownRecord { collection: &'static str, id: String },

    #[error("A remote sync is already in progress")]
    SyncBusy,

    #[error("Remote sync is not configured (set remote_url and remote_key)")]
    RemoteDisabled,

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AcademyError>;
