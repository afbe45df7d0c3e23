use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Task execution aborted: {0}")]
    Aborted(String),
}

impl Error {
    /// Whether a task that failed with this error should stay eligible for
    /// the next tick.
    ///
    /// Transport, parse and storage failures are transient from the
    /// scheduler's point of view. A malformed endpoint address or a
    /// configuration problem will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::Config(_) | Error::UrlParse(_) | Error::InvalidEndpoint(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
