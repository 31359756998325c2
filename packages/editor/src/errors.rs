//! Error types for the editor

use crate::commands::Rejection;
use crate::media::MediaError;
use folio_schema::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Command rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EditorResult<T> = Result<T, EditorError>;
