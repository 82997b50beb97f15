use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SortError {
    #[error("storySort weight for '{segment}' must be a finite number, got {weight}")]
    InvalidWeight { segment: String, weight: f64 },
}

pub type SortResult<T> = Result<T, SortError>;
