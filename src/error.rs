// Error kinds surfaced by the library. Every failure propagates straight
// up to the command that triggered it; nothing here is retried.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GostError>;

#[derive(Debug, Error)]
pub enum GostError {
    /// No credential file yet. The caller should run the interactive
    /// login and save the result.
    #[error("no config file found at {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("could not get token, code: {status}, body: {body}")]
    Auth { status: u16, body: String },

    #[error("request failed, code: {status}, body: {body}")]
    Http { status: u16, body: String },

    #[error("gist {id} has no file named {file:?}")]
    FileNotFound { id: String, file: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("could not launch browser: {0}")]
    Exec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl GostError {
    /// HTTP status carried by `Auth` and `Http` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            GostError::Auth { status, .. } | GostError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
