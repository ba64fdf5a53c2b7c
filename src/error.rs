use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid course sheet link: {0}")]
    InvalidSource(String),

    #[error("Course sheet unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
