use crate::level::AnnotationLevel;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
    #[error("{next} annotations cannot follow {previous} annotations")]
    OutOfOrder {
        previous: AnnotationLevel,
        next: AnnotationLevel,
    },

    #[error("invalid {level} annotations: {message}")]
    InvalidAnnotations {
        level: AnnotationLevel,
        message: String,
    },
}

/// Failure raised by a loader; fails the whole load
#[derive(Error, Debug, Clone, PartialEq)]
#[error("loader failed: {message}")]
pub struct LoaderError {
    pub message: String,
}

impl LoaderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ComposeResult<T> = Result<T, ComposeError>;
