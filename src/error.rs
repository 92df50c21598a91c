use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Connection refused, TLS failure or rejected login. Nothing is fetched.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server rejected a command (SELECT, SEARCH, FETCH).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A single message could not be turned into a record.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}
