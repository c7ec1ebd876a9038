//! Unified error types for the harvester.
//!
//! Only transport failures on listing pages escalate past a single item; every
//! other variant is logged and isolated to the unit or resource in progress.

use tokio_rusqlite::rusqlite;

/// Unified error types for edsite-harvest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed or canonicalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Server answered with a non-success status.
    #[error("HTTP_ERROR: {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Network or protocol failure before a status was received.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Archive package could not be staged or written.
    #[error("ARCHIVE_ERROR: {0}")]
    Archive(String),

    /// Catalog rejected an entry or could not be written.
    #[error("CATALOG_ERROR: {0}")]
    Catalog(String),

    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for any failure of the page fetch collaborator.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::HttpStatus { .. } | Error::Transport(_) | Error::FetchTooLarge(_) | Error::InvalidUrl(_)
        )
    }

    /// True only when the server answered with an error status.
    pub fn is_http_status(&self) -> bool {
        matches!(self, Error::HttpStatus { .. })
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
