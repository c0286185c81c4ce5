use std::io;

use thiserror::Error;

/// Errors raised while reading or writing Verilith file formats.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid design snapshot: {0}")]
    InvalidDesign(String),
}
