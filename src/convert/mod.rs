//! COPY-to-INSERT conversion of PostgreSQL dumps.
//!
//! The converter is a line-driven state machine:
//! - Outside a block, a `COPY ... FROM stdin;` header opens one; session and
//!   meta lines (`COPY`, `SET`, `SELECT`, `--`, `\`) are dropped and every
//!   other line passes through.
//! - Inside a block, each line is a tab-separated row until `\.`, which
//!   flushes one INSERT per buffered row.
//! - A malformed header or a row with the wrong field count aborts only the
//!   current block; lines up to its terminator are skipped.

mod copy_to_insert;
mod warnings;

pub use copy_to_insert::{
    copy_to_inserts, field_count, format_value, is_terminator, looks_like_copy_header,
    parse_copy_header, row_to_insert, CopyHeader, BLOCK_TERMINATOR, NULL_SENTINEL,
};
pub use warnings::{ConvertWarning, WarningCollector};

use crate::error::{ParseError, UnterminatedBlockError, UnterminatedPolicy};
use serde::Serialize;
use tracing::debug;

/// Prefixes of lines dropped when they appear outside a COPY block
const DROPPED_PREFIXES: [&str; 5] = ["COPY", "SET", "SELECT", "--", "\\"];

/// Statistics from the convert pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct ConvertStats {
    /// Input lines seen
    pub lines_read: u64,
    /// COPY blocks turned into INSERT statements
    pub blocks_converted: u64,
    /// COPY blocks aborted by a parse error
    pub blocks_aborted: u64,
    /// INSERT statements emitted
    pub rows_converted: u64,
    /// Lines copied to the output unchanged
    pub lines_passed_through: u64,
    /// Session, comment and meta-command lines removed
    pub lines_dropped: u64,
}

#[derive(Debug)]
enum BlockState {
    Outside,
    InBlock {
        header: CopyHeader,
        start_line: usize,
        rows: Vec<String>,
    },
    /// Aborted block: consume lines until its terminator
    Skipping,
}

/// Converts dump lines to output lines, one call per input line.
pub struct DumpConverter {
    state: BlockState,
    policy: UnterminatedPolicy,
    warnings: Vec<ConvertWarning>,
    stats: ConvertStats,
}

/// Everything the convert pass produces
#[derive(Debug, Default)]
pub struct ConvertOutput {
    pub sql: String,
    pub stats: ConvertStats,
    pub warnings: Vec<ConvertWarning>,
}

impl Default for DumpConverter {
    fn default() -> Self {
        Self::new(UnterminatedPolicy::default())
    }
}

impl DumpConverter {
    pub fn new(policy: UnterminatedPolicy) -> Self {
        Self {
            state: BlockState::Outside,
            policy,
            warnings: Vec::new(),
            stats: ConvertStats::default(),
        }
    }

    /// Check if a COPY block is currently open
    pub fn in_block(&self) -> bool {
        !matches!(self.state, BlockState::Outside)
    }

    /// Feed one input line (without its newline). `line_no` is 1-based.
    pub fn push_line(&mut self, line_no: usize, line: &str, out: &mut Vec<String>) {
        self.stats.lines_read += 1;

        match &mut self.state {
            BlockState::Outside => self.handle_outside(line_no, line, out),
            BlockState::InBlock {
                header,
                start_line,
                rows,
            } => {
                if is_terminator(line) {
                    debug!(
                        table = %header.qualified_name(),
                        start_line = *start_line,
                        rows = rows.len(),
                        "COPY block converted"
                    );
                    let inserts = copy_to_inserts(header, rows);
                    self.stats.blocks_converted += 1;
                    self.stats.rows_converted += inserts.len() as u64;
                    out.extend(inserts);
                    self.state = BlockState::Outside;
                    return;
                }

                let found = field_count(line);
                if !header.columns.is_empty() && found != header.columns.len() {
                    let error = ParseError::ColumnCount {
                        line: line_no,
                        table: header.qualified_name(),
                        expected: header.columns.len(),
                        found,
                    };
                    self.abort_block(error);
                    return;
                }
                rows.push(line.to_string());
            }
            BlockState::Skipping => {
                if is_terminator(line) {
                    self.state = BlockState::Outside;
                }
            }
        }
    }

    fn handle_outside(&mut self, line_no: usize, line: &str, out: &mut Vec<String>) {
        if let Some(header) = parse_copy_header(line) {
            debug!(table = %header.qualified_name(), line = line_no, "COPY block opened");
            self.state = BlockState::InBlock {
                header,
                start_line: line_no,
                rows: Vec::new(),
            };
            return;
        }

        if looks_like_copy_header(line) {
            let preview: String = line.trim().chars().take(60).collect();
            self.abort_block(ParseError::MalformedHeader {
                line: line_no,
                preview,
            });
            return;
        }

        if DROPPED_PREFIXES.iter().any(|p| line.starts_with(p)) {
            self.stats.lines_dropped += 1;
        } else {
            self.stats.lines_passed_through += 1;
            out.push(line.to_string());
        }
    }

    fn abort_block(&mut self, error: ParseError) {
        self.stats.blocks_aborted += 1;
        self.warnings.push(error.into());
        self.state = BlockState::Skipping;
    }

    /// Close out the input. An open block is flushed or discarded according
    /// to the unterminated-block policy, and reported either way.
    pub fn finish(&mut self, out: &mut Vec<String>) {
        match std::mem::replace(&mut self.state, BlockState::Outside) {
            BlockState::InBlock {
                header,
                start_line,
                rows,
            } => {
                self.warnings.push(
                    UnterminatedBlockError {
                        table: header.qualified_name(),
                        line: start_line,
                        rows: rows.len(),
                        policy: self.policy,
                    }
                    .into(),
                );
                if self.policy == UnterminatedPolicy::Flush {
                    let inserts = copy_to_inserts(&header, &rows);
                    self.stats.blocks_converted += 1;
                    self.stats.rows_converted += inserts.len() as u64;
                    out.extend(inserts);
                }
            }
            BlockState::Skipping | BlockState::Outside => {}
        }
    }

    pub fn stats(&self) -> &ConvertStats {
        &self.stats
    }

    pub fn take_warnings(&mut self) -> Vec<ConvertWarning> {
        std::mem::take(&mut self.warnings)
    }
}

/// Convert a whole dump held in memory.
pub fn convert_dump(input: &str, policy: UnterminatedPolicy) -> ConvertOutput {
    let mut converter = DumpConverter::new(policy);
    let mut lines = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        converter.push_line(idx + 1, line, &mut lines);
    }
    converter.finish(&mut lines);

    let mut sql = String::with_capacity(input.len());
    for line in &lines {
        sql.push_str(line);
        sql.push('\n');
    }

    ConvertOutput {
        sql,
        stats: converter.stats().clone(),
        warnings: converter.take_warnings(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "--\n-- PostgreSQL database dump\n--\nSET statement_timeout = 0;\nSELECT pg_catalog.set_config('search_path', '', false);\n\\connect app\n\nCOPY public.user (id, role, name) FROM stdin;\n1\tadmin\tAlice\n2\t\\N\tBob\n\\.\n\nCREATE TABLE t (id int);\n";

    #[test]
    fn test_convert_basic_dump() {
        let out = convert_dump(DUMP, UnterminatedPolicy::Flush);
        assert_eq!(
            out.sql,
            "\nINSERT INTO public.user (id, role, name) VALUES ('1', 'admin', 'Alice');\n\
             INSERT INTO public.user (id, role, name) VALUES ('2', NULL, 'Bob');\n\
             \n\
             CREATE TABLE t (id int);\n"
        );
        assert_eq!(out.stats.blocks_converted, 1);
        assert_eq!(out.stats.rows_converted, 2);
        assert_eq!(out.stats.lines_dropped, 6);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_empty_block() {
        let out = convert_dump("COPY t (a) FROM stdin;\n\\.\n", UnterminatedPolicy::Flush);
        assert_eq!(out.sql, "");
        assert_eq!(out.stats.blocks_converted, 1);
    }

    #[test]
    fn test_unterminated_flush() {
        let out = convert_dump("COPY t (a) FROM stdin;\n1\n2\n", UnterminatedPolicy::Flush);
        assert_eq!(
            out.sql,
            "INSERT INTO t (a) VALUES ('1');\nINSERT INTO t (a) VALUES ('2');\n"
        );
        assert_eq!(out.warnings.len(), 1);
        assert!(matches!(
            &out.warnings[0],
            ConvertWarning::UnterminatedBlock { error } if error.rows == 2
        ));
    }

    #[test]
    fn test_unterminated_discard() {
        let out = convert_dump("x;\nCOPY t (a) FROM stdin;\n1\n", UnterminatedPolicy::Discard);
        assert_eq!(out.sql, "x;\n");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_column_mismatch_aborts_only_current_block() {
        let input = "COPY a (x) FROM stdin;\n1\n\\.\n\
                     COPY b (x, y) FROM stdin;\n1\t2\n3\n4\t5\n\\.\n\
                     COPY c (z) FROM stdin;\n9\n\\.\n";
        let out = convert_dump(input, UnterminatedPolicy::Flush);
        assert_eq!(
            out.sql,
            "INSERT INTO a (x) VALUES ('1');\nINSERT INTO c (z) VALUES ('9');\n"
        );
        assert_eq!(out.stats.blocks_aborted, 1);
        assert_eq!(out.stats.blocks_converted, 2);
        assert!(matches!(
            &out.warnings[0],
            ConvertWarning::Parse { error: ParseError::ColumnCount { line: 6, expected: 2, found: 1, .. } }
        ));
    }

    #[test]
    fn test_malformed_header_skips_block() {
        let input = "COPY broken (a FROM stdin;\n1\n\\.\nkeep;\n";
        let out = convert_dump(input, UnterminatedPolicy::Flush);
        assert_eq!(out.sql, "keep;\n");
        assert!(matches!(
            &out.warnings[0],
            ConvertWarning::Parse { error: ParseError::MalformedHeader { line: 1, .. } }
        ));
    }

    #[test]
    fn test_rows_that_look_like_commands_stay_data() {
        let input = "COPY t (a) FROM stdin;\n-- not a comment\nSET x\n\\.\n";
        let out = convert_dump(input, UnterminatedPolicy::Flush);
        assert_eq!(
            out.sql,
            "INSERT INTO t (a) VALUES ('-- not a comment');\nINSERT INTO t (a) VALUES ('SET x');\n"
        );
    }

    #[test]
    fn test_push_line_tracks_block_state() {
        let mut converter = DumpConverter::default();
        let mut out = Vec::new();
        converter.push_line(1, "COPY t (a) FROM stdin;", &mut out);
        assert!(converter.in_block());
        converter.push_line(2, "1", &mut out);
        assert!(out.is_empty());
        converter.push_line(3, "\\.", &mut out);
        assert!(!converter.in_block());
        assert_eq!(out, vec!["INSERT INTO t (a) VALUES ('1');"]);
    }
}
