use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The index changed underneath an operation, or its bookkeeping no longer adds up.
    #[error("Index inconsistency in {context}: expected {expected} rows, got {actual}")]
    Inconsistent {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn inconsistent(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::Inconsistent {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// True when the library data is inconsistent, as opposed to the tool failing.
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Error::Inconsistent { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
