//! Errors for the station locator
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to read response body: {0}")]
    Read(#[source] reqwest::Error),

    #[error("Failed to decode station payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl StationError {
    /// HTTP status code the boundary layer answers with
    pub fn status_code(&self) -> u16 {
        match self {
            StationError::Validation(_) => 400,
            StationError::Unauthorized(_) => 401,
            StationError::NotFound(_) => 404,
            _ => 500,
        }
    }
}
