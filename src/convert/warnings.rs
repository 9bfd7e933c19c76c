//! Warning system for the conversion pipeline.
//!
//! Tracks recoverable problems (aborted blocks, unterminated blocks,
//! statements a pass had to skip) so they can be reported at the end.

use crate::error::{ParseError, UnterminatedBlockError};
use serde::Serialize;

/// Warning types that can occur during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvertWarning {
    /// COPY header or row could not be converted; the block was aborted
    Parse { error: ParseError },
    /// Input ended inside a COPY block
    UnterminatedBlock { error: UnterminatedBlockError },
    /// INSERT into a role table has no role column to repair
    RoleColumnMissing { table: String, column: String },
    /// INSERT statement could not be parsed by a cleanup pass
    SkippedStatement { pass: String, statement_preview: String },
}

impl From<ParseError> for ConvertWarning {
    fn from(error: ParseError) -> Self {
        ConvertWarning::Parse { error }
    }
}

impl From<UnterminatedBlockError> for ConvertWarning {
    fn from(error: UnterminatedBlockError) -> Self {
        ConvertWarning::UnterminatedBlock { error }
    }
}

impl std::fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertWarning::Parse { error } => write!(f, "Block aborted: {}", error),
            ConvertWarning::UnterminatedBlock { error } => write!(f, "{}", error),
            ConvertWarning::RoleColumnMissing { table, column } => {
                write!(
                    f,
                    "INSERT into '{}' has no '{}' column - role values not checked",
                    table, column
                )
            }
            ConvertWarning::SkippedStatement {
                pass,
                statement_preview,
            } => {
                write!(f, "Skipped by {} pass: {}", pass, statement_preview)
            }
        }
    }
}

/// Collects warnings during a run
#[derive(Debug)]
pub struct WarningCollector {
    warnings: Vec<ConvertWarning>,
    max_warnings: usize,
    total: usize,
}

impl Default for WarningCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl WarningCollector {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: 100,
            total: 0,
        }
    }

    /// Add a warning
    pub fn add(&mut self, warning: impl Into<ConvertWarning>) {
        let warning = warning.into();
        if self.warnings.iter().any(|w| Self::is_similar(w, &warning)) {
            return;
        }
        tracing::warn!("{}", warning);
        self.total += 1;
        if self.warnings.len() < self.max_warnings {
            self.warnings.push(warning);
        }
    }

    /// Missing role columns repeat once per statement; report each table once
    fn is_similar(a: &ConvertWarning, b: &ConvertWarning) -> bool {
        match (a, b) {
            (
                ConvertWarning::RoleColumnMissing { table: t1, .. },
                ConvertWarning::RoleColumnMissing { table: t2, .. },
            ) => t1.eq_ignore_ascii_case(t2),
            (
                ConvertWarning::SkippedStatement {
                    statement_preview: p1,
                    ..
                },
                ConvertWarning::SkippedStatement {
                    statement_preview: p2,
                    ..
                },
            ) => p1 == p2,
            _ => false,
        }
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = ConvertWarning>) {
        for w in warnings {
            self.add(w);
        }
    }

    pub fn warnings(&self) -> &[ConvertWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ConvertWarning> {
        self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        self.total > 0
    }

    /// Number of distinct warnings, including any past the storage limit
    pub fn count(&self) -> usize {
        self.total
    }

    pub fn is_truncated(&self) -> bool {
        self.total > self.warnings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_role_column_missing_deduplicated() {
        let mut collector = WarningCollector::new();
        for _ in 0..3 {
            collector.add(ConvertWarning::RoleColumnMissing {
                table: "user".to_string(),
                column: "role".to_string(),
            });
        }
        assert_eq!(collector.count(), 1);
    }

    #[test]
    fn test_limit_keeps_counting() {
        let mut collector = WarningCollector {
            max_warnings: 1,
            ..WarningCollector::new()
        };
        collector.add(ParseError::MalformedHeader {
            line: 1,
            preview: "COPY x FROM stdin;".to_string(),
        });
        collector.add(ParseError::MalformedHeader {
            line: 9,
            preview: "COPY y FROM stdin;".to_string(),
        });
        assert_eq!(collector.count(), 2);
        assert_eq!(collector.warnings().len(), 1);
        assert!(collector.is_truncated());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_repeated_warning_logged_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut collector = WarningCollector::new();
            for _ in 0..3 {
                collector.add(ConvertWarning::RoleColumnMissing {
                    table: "user".to_string(),
                    column: "role".to_string(),
                });
            }
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("has no 'role' column").count(), 1);
    }
}
