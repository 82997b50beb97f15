use storyloom_sort::SortError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid stories pattern '{pattern}': {message}")]
    InvalidSpecifier { pattern: String, message: String },

    #[error(transparent)]
    Sort(#[from] SortError),
}

pub type IndexResult<T> = Result<T, IndexError>;
