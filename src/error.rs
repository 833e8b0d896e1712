use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConsoleError {
    #[error("api request failed: {0}")]
    Transport(String),

    #[error("api returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode api response: {0}")]
    Decode(String),

    #[error("metadata store error: {0}")]
    Store(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unable to resolve local data directory")]
    DataDir,
}

impl From<rusqlite::Error> for ConsoleError {
    fn from(err: rusqlite::Error) -> Self {
        ConsoleError::Store(err.to_string())
    }
}
