//! Error types for the demand preparation pipeline.
//!
//! - [`FormatError`] - malformed dates, numbers or missing columns
//! - [`PrepError`] - top-level error returned by loaders and transformations
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Format Errors
// =============================================================================

/// Errors caused by input that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// A date string is not `YYYY-MM-DD` or is not a real calendar date.
    #[error("Invalid date '{value}'{}", line_suffix(.line))]
    InvalidDate { value: String, line: Option<usize> },

    /// A required column is absent from the header.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A data row has more cells than the header.
    #[error("Line {line} has {found} fields, but the header has {expected}")]
    TooManyFields {
        expected: usize,
        found: usize,
        line: usize,
    },

    /// A numeric column holds a value that is neither a number nor blank.
    #[error("Invalid number in column '{column}' (value '{value}') on line {line}")]
    InvalidNumber {
        column: String,
        value: String,
        line: usize,
    },
}

impl FormatError {
    /// Attach the 1-based data line a date error was found on.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            FormatError::InvalidDate { value, .. } => FormatError::InvalidDate {
                value,
                line: Some(line),
            },
            other => other,
        }
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(l) => format!(" on line {}", l),
        None => String::new(),
    }
}

// =============================================================================
// Top-level Errors
// =============================================================================

/// Errors returned by the loaders, transformations and exporters.
#[derive(Debug, Error)]
pub enum PrepError {
    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV reader or writer rejected the data. csv prefixes its own
    /// messages, so the source is shown as is.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Input does not have the expected format.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A caller-supplied argument violates a precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for preparation operations.
pub type PrepResult<T> = Result<T, PrepError>;
