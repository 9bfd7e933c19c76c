//! Rewrite PostgreSQL boolean text literals ('t' / 'f') as MySQL 1 / 0.

use super::{skipped_statements, Pass, PassOutcome};
use crate::config::BooleanConfig;
use crate::parser::{apply_edits, scan_inserts, Edit, InsertStatement, SqlValue};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How boolean columns are identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanMode {
    /// Columns whose every non-NULL value is 't' or 'f', plus configured ones
    #[default]
    Infer,
    /// Only the configured columns
    Columns,
    /// Every 't' / 'f' literal in the document, regardless of column
    Legacy,
}

impl std::str::FromStr for BooleanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "infer" => Ok(BooleanMode::Infer),
            "columns" => Ok(BooleanMode::Columns),
            "legacy" => Ok(BooleanMode::Legacy),
            _ => Err(format!(
                "Unknown boolean mode: {}. Valid options: infer, columns, legacy",
                s
            )),
        }
    }
}

impl std::fmt::Display for BooleanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BooleanMode::Infer => write!(f, "infer"),
            BooleanMode::Columns => write!(f, "columns"),
            BooleanMode::Legacy => write!(f, "legacy"),
        }
    }
}

/// (table, column) identity. Columns without a name use their position.
type ColumnKey = (String, String);

fn column_key(stmt: &InsertStatement, idx: usize) -> ColumnKey {
    let column = stmt
        .columns
        .as_ref()
        .and_then(|cols| cols.get(idx))
        .map(|c| c.to_lowercase())
        .unwrap_or_else(|| format!("#{}", idx));
    (stmt.table_name().to_lowercase(), column)
}

fn boolean_literal(value: &SqlValue) -> Option<&'static str> {
    match value.as_str()? {
        "t" => Some("1"),
        "f" => Some("0"),
        _ => None,
    }
}

pub struct BooleanNormalizer<'a> {
    config: &'a BooleanConfig,
}

impl<'a> BooleanNormalizer<'a> {
    pub fn new(config: &'a BooleanConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, sql: &str) -> PassOutcome {
        match self.config.mode {
            BooleanMode::Legacy => Self::normalize_legacy(sql),
            BooleanMode::Infer | BooleanMode::Columns => self.normalize_by_column(sql),
        }
    }

    /// Context-free substitution. Also rewrites text columns holding 't' or 'f'.
    fn normalize_legacy(sql: &str) -> PassOutcome {
        let rewritten = (sql.matches("'t'").count() + sql.matches("'f'").count()) as u64;
        let sql = sql.replace("'t'", "1").replace("'f'", "0");
        PassOutcome {
            sql,
            rewritten,
            ..Default::default()
        }
    }

    fn normalize_by_column(&self, sql: &str) -> PassOutcome {
        let scan = scan_inserts(sql);
        let warnings = skipped_statements(Pass::Booleans, &scan.unparsed);

        let boolean_columns = self.boolean_columns(&scan.statements);
        debug!(columns = boolean_columns.len(), "boolean columns identified");

        let mut edits = Vec::new();
        for stmt in &scan.statements {
            for row in &stmt.rows {
                for (idx, span) in row.iter().enumerate() {
                    let Some(literal) = boolean_literal(&span.value) else {
                        continue;
                    };
                    if boolean_columns.contains(&column_key(stmt, idx)) {
                        edits.push(Edit::replace(span, literal));
                    }
                }
            }
        }

        let rewritten = edits.len() as u64;
        PassOutcome {
            sql: apply_edits(sql, edits),
            rewritten,
            checked: 0,
            warnings,
        }
    }

    /// Configured columns, plus (in infer mode) every column whose non-NULL
    /// values are all 't' or 'f'.
    fn boolean_columns(&self, statements: &[InsertStatement]) -> AHashSet<ColumnKey> {
        let mut columns = AHashSet::new();

        for (table, cols) in &self.config.columns {
            for col in cols {
                columns.insert((table.to_lowercase(), col.to_lowercase()));
            }
        }

        if self.config.mode != BooleanMode::Infer {
            return columns;
        }

        // true while every non-NULL value seen is a boolean literal
        let mut candidates: AHashMap<ColumnKey, bool> = AHashMap::new();
        for stmt in statements {
            for row in &stmt.rows {
                for (idx, span) in row.iter().enumerate() {
                    if span.value.is_null() {
                        continue;
                    }
                    let is_bool = boolean_literal(&span.value).is_some();
                    candidates
                        .entry(column_key(stmt, idx))
                        .and_modify(|all| *all &= is_bool)
                        .or_insert(is_bool);
                }
            }
        }

        columns.extend(
            candidates
                .into_iter()
                .filter(|(_, all_bool)| *all_bool)
                .map(|(key, _)| key),
        );
        columns
    }
}
