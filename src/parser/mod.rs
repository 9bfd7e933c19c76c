//! Locates INSERT statements in SQL text and rewrites values in place.

mod insert;

pub use insert::{unquote_identifier, InsertParser, InsertStatement, SqlValue, ValueSpan};

use once_cell::sync::Lazy;
use regex::Regex;

/// `INSERT INTO` at the start of the text, a line, or after a `;`
static INSERT_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[;\n])[ \t\r]*(INSERT\s+INTO)\b").unwrap());

/// An INSERT-looking span that failed to parse
#[derive(Debug, Clone)]
pub struct Unparsed {
    pub offset: usize,
    pub preview: String,
    pub reason: String,
}

/// Result of scanning a document
#[derive(Debug, Default)]
pub struct ScanResult {
    pub statements: Vec<InsertStatement>,
    pub unparsed: Vec<Unparsed>,
}

/// Find and parse every INSERT statement in `text`, in document order.
pub fn scan_inserts(text: &str) -> ScanResult {
    let mut result = ScanResult::default();
    let mut cursor = 0;

    for caps in INSERT_START_RE.captures_iter(text) {
        let Some(keyword) = caps.get(1) else {
            continue;
        };
        // Match inside a statement we already consumed (string data)
        if keyword.start() < cursor {
            continue;
        }

        match InsertParser::new(text, keyword.start()).parse() {
            Ok(stmt) => {
                cursor = stmt.end;
                result.statements.push(stmt);
            }
            Err(e) => {
                let preview: String = text[keyword.start()..].chars().take(60).collect();
                result.unparsed.push(Unparsed {
                    offset: keyword.start(),
                    preview: preview.lines().next().unwrap_or_default().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    result
}

/// A replacement of `text[start..end]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: &ValueSpan, replacement: impl Into<String>) -> Self {
        Self {
            start: span.start,
            end: span.end,
            replacement: replacement.into(),
        }
    }
}

/// Apply non-overlapping edits to `text`.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    if edits.is_empty() {
        return text.to_string();
    }
    edits.sort_by_key(|e| e.start);

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for edit in edits {
        debug_assert!(edit.start >= last, "overlapping edits");
        out.push_str(&text[last..edit.start]);
        out.push_str(&edit.replacement);
        last = edit.end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_multiple_statements() {
        let text = "CREATE TABLE t (a int);\nINSERT INTO t (a) VALUES ('1');\ninsert into t (a) VALUES ('2'); INSERT INTO u VALUES (3);\n";
        let scan = scan_inserts(text);
        assert_eq!(scan.statements.len(), 3);
        assert_eq!(scan.statements[2].table, "u");
        assert!(scan.unparsed.is_empty());
    }

    #[test]
    fn test_scan_ignores_insert_inside_string() {
        let text = "INSERT INTO t (a) VALUES ('x;\nINSERT INTO evil VALUES (1);');\n";
        let scan = scan_inserts(text);
        assert_eq!(scan.statements.len(), 1);
        assert_eq!(scan.statements[0].table, "t");
    }

    #[test]
    fn test_scan_reports_unparsed() {
        let text = "INSERT INTO t SELECT * FROM u;\nINSERT INTO t VALUES (1);\n";
        let scan = scan_inserts(text);
        assert_eq!(scan.statements.len(), 1);
        assert_eq!(scan.unparsed.len(), 1);
        assert_eq!(scan.unparsed[0].preview, "INSERT INTO t SELECT * FROM u;");
    }

    #[test]
    fn test_apply_edits() {
        let text = "VALUES ('a', 'b', 'c')";
        let edits = vec![
            Edit { start: 18, end: 21, replacement: "0".to_string() },
            Edit { start: 8, end: 11, replacement: "NULL".to_string() },
        ];
        assert_eq!(apply_edits(text, edits), "VALUES (NULL, 'b', 0)");
    }
}
