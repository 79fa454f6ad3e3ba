//! Error taxonomy for loading and color-mapping legacy mesh files.

use std::path::PathBuf;

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Fatal failures while parsing one input file.
///
/// Any of these aborts the pipeline for that input only; callers batching
/// several files may carry on with the rest.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("binary legacy files are not supported (line {line})")]
    UnsupportedEncoding { line: usize },

    #[error("malformed header on line {line}: {message}")]
    MalformedHeader { line: usize, message: String },

    #[error("{block} block truncated: expected {expected} values, found {found} (line {line})")]
    Truncated {
        block: &'static str,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("point index {index} out of range ({points} points) on line {line}")]
    InvalidIndex {
        line: usize,
        index: i64,
        points: usize,
    },

    #[error("required {block} block is missing")]
    MissingRequiredBlock { block: &'static str },

    #[error("unsupported cell layout on line {line}: {message}")]
    UnsupportedCellLayout { line: usize, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub(crate) fn header(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn layout(line: usize, message: impl Into<String>) -> Self {
        Self::UnsupportedCellLayout {
            line,
            message: message.into(),
        }
    }
}

/// Lookup-table failures. These are recoverable: the pipeline logs them and
/// falls back to a synthesized table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LutError {
    #[error("lookup table has no entries")]
    Empty,

    #[error("lookup table '{name}' declares {declared} entries but {found} were readable")]
    CountMismatch {
        name: String,
        declared: usize,
        found: usize,
    },

    #[error("lookup table '{name}' not found")]
    NotFound { name: String },

    #[error("invalid scalar range [{lo}, {hi}]")]
    InvalidRange { lo: f64, hi: f64 },
}

/// Broken invariants of assembled output buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("{buffer} holds {len} entries for {vertices} vertices")]
    LengthMismatch {
        buffer: &'static str,
        len: usize,
        vertices: usize,
    },

    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    #[error("index {index} out of range ({vertices} vertices)")]
    IndexOutOfRange { index: u32, vertices: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = ParseError::InvalidIndex {
            line: 12,
            index: 9,
            points: 8,
        };
        assert_eq!(
            err.to_string(),
            "point index 9 out of range (8 points) on line 12"
        );

        let lut = LutError::CountMismatch {
            name: "my_table".into(),
            declared: 8,
            found: 6,
        };
        assert!(lut.to_string().contains("declares 8 entries but 6"));
    }
}
