use thiserror::Error;

/// Failure to get any response from the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    Transport(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Cache backend failure (open/read/write rejected).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("corrupt cache entry for {0}")]
    Corrupt(String),
    #[error("cache storage unavailable")]
    Unavailable,
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid lifecycle transition: {from} -> {to}")]
pub struct LifecycleError {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("no data available")]
    NoData,
}
