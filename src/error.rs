use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a run. None of these are recoverable: the caller
/// logs the message and exits.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty sequence, non-ACGT character, or mismatched original/variant lengths
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A feature the linear model needs is absent from the weight table
    #[error("Missing weight for feature '{0}'")]
    MissingWeight(String),

    /// Table without a required column, or a cell that does not parse
    #[error("Malformed table {source_name}: {message}")]
    MalformedTable { source_name: String, message: String },

    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub fn malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedTable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
