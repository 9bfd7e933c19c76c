//! Convert PostgreSQL COPY FROM stdin rows to INSERT statements.
//!
//! Handles:
//! - Header parsing (optionally schema-qualified, double-quoted identifiers)
//! - Tab-separated value splitting
//! - NULL handling (\N → NULL)
//! - Quote escaping by doubling (' → '')

use once_cell::sync::Lazy;
use regex::Regex;

/// NULL marker used in COPY text format
pub const NULL_SENTINEL: &str = "\\N";

/// Line that terminates a COPY data block
pub const BLOCK_TERMINATOR: &str = "\\.";

/// Result of parsing a COPY header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyHeader {
    /// Qualifier before the table name (e.g., "public" or "app.public")
    pub schema: Option<String>,
    /// Table name
    pub table: String,
    /// Column list (may be empty if not specified)
    pub columns: Vec<String>,
}

impl CopyHeader {
    /// Table name as written in the emitted INSERT, schema kept.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.table),
            None => self.table.clone(),
        }
    }
}

static RE_COPY: Lazy<Regex> = Lazy::new(|| {
    // COPY [ONLY] [db.][schema.]table [(columns)] FROM stdin[;]
    Regex::new(
        r#"(?i)^COPY\s+(?:ONLY\s+)?((?:(?:"[^"]+"|[\w$]+)\.)*)("[^"]+"|[\w$]+)\s*(?:\(([^)]*)\))?\s+FROM\s+stdin\s*;?\s*$"#,
    )
    .unwrap()
});

/// Parse a COPY header to extract table and columns
/// Input: "COPY schema.table (col1, col2) FROM stdin;"
pub fn parse_copy_header(line: &str) -> Option<CopyHeader> {
    let caps = RE_COPY.captures(line.trim_end())?;

    let schema = caps
        .get(1)
        .map(|m| m.as_str().trim_end_matches('.'))
        .filter(|s| !s.is_empty())
        .map(unquote);
    let table = unquote(caps.get(2)?.as_str());
    let columns = caps
        .get(3)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|c| unquote(c.trim()))
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(CopyHeader {
        schema,
        table,
        columns,
    })
}

/// True for lines that start a COPY-from-stdin block, parseable or not
pub fn looks_like_copy_header(line: &str) -> bool {
    line.starts_with("COPY") && line.to_ascii_uppercase().contains("FROM STDIN")
}

/// True for the `\.` line that closes a COPY block
pub fn is_terminator(line: &str) -> bool {
    line.trim() == BLOCK_TERMINATOR
}

fn unquote(ident: &str) -> String {
    ident.replace('"', "")
}

/// Format a single COPY field as a SQL literal
pub fn format_value(field: &str) -> String {
    if field == NULL_SENTINEL {
        "NULL".to_string()
    } else {
        format!("'{}'", field.replace('\'', "''"))
    }
}

/// Number of fields a data row splits into
pub fn field_count(row: &str) -> usize {
    row.split('\t').count()
}

/// Convert one tab-separated data row into an INSERT statement.
///
/// The field count is not checked here; callers compare it against the
/// header first.
pub fn row_to_insert(header: &CopyHeader, row: &str) -> String {
    let values: Vec<String> = row.split('\t').map(format_value).collect();

    if header.columns.is_empty() {
        format!(
            "INSERT INTO {} VALUES ({});",
            header.qualified_name(),
            values.join(", ")
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({});",
            header.qualified_name(),
            header.columns.join(", "),
            values.join(", ")
        )
    }
}

/// Convert buffered rows of one block, one INSERT per row
pub fn copy_to_inserts(header: &CopyHeader, rows: &[String]) -> Vec<String> {
    rows.iter().map(|row| row_to_insert(header, row)).collect()
}
