//! Error types for the conversion pipeline.
//!
//! `ParseError` and `UnterminatedBlockError` are recoverable: the converter
//! records them as warnings and keeps going. `Error` is what the public API
//! returns when a run cannot continue.

use serde::Serialize;
use thiserror::Error;

/// A COPY header or data row that could not be converted.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    /// Line looks like `COPY ... FROM stdin` but does not match the header grammar
    #[error("line {line}: malformed COPY header: {preview}")]
    MalformedHeader { line: usize, preview: String },

    /// Data row field count differs from the header's column list
    #[error("line {line}: table {table} declares {expected} columns but row has {found} fields")]
    ColumnCount {
        line: usize,
        table: String,
        expected: usize,
        found: usize,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::MalformedHeader { line, .. } | ParseError::ColumnCount { line, .. } => {
                *line
            }
        }
    }
}

/// What happens to buffered rows when input ends inside a COPY block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnterminatedPolicy {
    /// Emit the buffered rows as INSERT statements
    #[default]
    Flush,
    /// Drop the buffered rows
    Discard,
}

impl std::str::FromStr for UnterminatedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flush" => Ok(UnterminatedPolicy::Flush),
            "discard" => Ok(UnterminatedPolicy::Discard),
            _ => Err(format!(
                "Unknown unterminated-block policy: {}. Valid options: flush, discard",
                s
            )),
        }
    }
}

impl std::fmt::Display for UnterminatedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnterminatedPolicy::Flush => write!(f, "flush"),
            UnterminatedPolicy::Discard => write!(f, "discard"),
        }
    }
}

/// End of input reached while a COPY block was still open.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("COPY block for table {table} opened at line {line} has no \\. terminator ({rows} rows, policy: {policy})")]
pub struct UnterminatedBlockError {
    pub table: String,
    pub line: usize,
    pub rows: usize,
    pub policy: UnterminatedPolicy,
}

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    UnterminatedBlock(#[from] UnterminatedBlockError),

    /// IO error (reading the dump or writing output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid option values or config file contents
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// An output or stage file resolves to the dump being read
    #[error("Refusing to overwrite input file {}", .0.display())]
    OverwritesInput(std::path::PathBuf),

    /// Warnings were produced while running in strict mode
    #[error("Strict mode: {0} warnings generated")]
    Strict(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
