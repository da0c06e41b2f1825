use sled::transaction::UnabortableTransactionError;
use thiserror::Error;

/// type alias for all operations in this crate that could fail with a [`KvsError`]
pub type Result<T> = std::result::Result<T, KvsError>;

/// The Error variants used by the kvs-web crate.
///
/// [`KvsError::Validation`] and [`KvsError::KeyNotFound`] are caused by the caller, every other
/// variant is treated as a storage (server side) failure.
#[derive(Error, Debug)]
pub enum KvsError {
    /// the requested key does not exist in the store
    #[error("Key not found")]
    KeyNotFound,

    /// the request was rejected before the store was touched
    #[error("{0}")]
    Validation(String),

    /// errors returned by the sled storage engine
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    /// a write transaction hit a conflict inside the engine. These are retried by the engine
    /// adapter and only escape it if a caller swallows the retry.
    #[error("transaction conflict")]
    Transaction(UnabortableTransactionError),

    /// file IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// serde_json errors
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// errors parsing command line options or configuration values
    #[error("{0}")]
    Parsing(String),

    /// errors raised by clap, this includes `--help` and `--version`
    #[error("{0}")]
    Cli(#[from] clap::Error),

    /// errors raised by the http client
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// generic error message, typically received from a remote server or a worker thread
    #[error("{0}")]
    StringErr(String),
}

impl From<UnabortableTransactionError> for KvsError {
    fn from(e: UnabortableTransactionError) -> Self {
        match e {
            UnabortableTransactionError::Storage(e) => KvsError::Sled(e),
            conflict => KvsError::Transaction(conflict),
        }
    }
}

impl KvsError {
    /// returns `true` if this error was caused by the request rather than by the store
    pub fn is_client_error(&self) -> bool {
        matches!(self, KvsError::KeyNotFound | KvsError::Validation(_))
    }
}
