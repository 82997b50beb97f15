//! Error types for story file parsing

use std::ops::Range;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;
pub type CsfResult<T> = Result<T, CsfError>;

/// Syntax error with the byte range it was raised at
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: Range<usize>,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Invalid syntax at {span:?}: {message}")]
    InvalidSyntax { span: Range<usize>, message: String },
}

impl ParseError {
    pub fn unexpected_token(
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span,
            message: message.into(),
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::UnexpectedToken { span, .. } | ParseError::InvalidSyntax { span, .. } => {
                span.clone()
            }
            ParseError::UnexpectedEof { pos, .. } => *pos..*pos,
        }
    }

    /// Short description without the position prefix
    pub fn message(&self) -> String {
        match self {
            ParseError::UnexpectedToken {
                expected, found, ..
            } => format!("expected {}, found {}", expected, found),
            ParseError::UnexpectedEof { expected, .. } => {
                format!("unexpected end of file, expected {}", expected)
            }
            ParseError::InvalidSyntax { message, .. } => message.clone(),
        }
    }

    /// 1-based line and column of the error start
    pub fn location(&self, source: &str) -> Location {
        Location::from_offset(source, self.span().start)
    }
}

/// 1-based position in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Self { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Failure to extract stories from a module
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CsfError {
    #[error("{file}:{location}: {message}")]
    Syntax {
        file: String,
        location: Location,
        message: String,
        #[source]
        error: ParseError,
    },

    #[error("{file}: no default export or meta() call found")]
    MissingMeta { file: String },

    #[error("{file}: unable to determine a title; add `title` to the default export")]
    MissingTitle { file: String },

    #[error("{file}: {message}")]
    InvalidMeta { file: String, message: String },
}

impl CsfError {
    pub fn syntax(file: impl Into<String>, source: &str, error: ParseError) -> Self {
        Self::Syntax {
            file: file.into(),
            location: error.location(source),
            message: error.message(),
            error,
        }
    }

    pub fn missing_meta(file: impl Into<String>) -> Self {
        Self::MissingMeta { file: file.into() }
    }

    pub fn missing_title(file: impl Into<String>) -> Self {
        Self::MissingTitle { file: file.into() }
    }

    pub fn invalid_meta(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMeta {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Position of the failure, when it came from the parser
    pub fn location(&self) -> Option<Location> {
        match self {
            CsfError::Syntax { location, .. } => Some(*location),
            _ => None,
        }
    }
}

/// Render a syntax error with a source snippet using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span();
    let start = span.start.min(source.len());
    let end = span.end.max(start + 1).min(source.len().max(start));

    let report = Report::build(ReportKind::Error, filename, start)
        .with_message("failed to parse story file")
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(error.message()),
        )
        .finish();

    let mut output = Vec::new();
    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return format!("{}: {}", filename, error);
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}
