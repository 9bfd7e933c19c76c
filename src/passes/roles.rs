//! Replace out-of-domain values of an enum column (default `user.role`).

use super::{skipped_statements, Pass, PassOutcome};
use crate::config::RoleConfig;
use crate::convert::ConvertWarning;
use crate::parser::{apply_edits, scan_inserts, Edit, InsertStatement, SqlValue, ValueSpan};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the role value is located inside a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleStrategy {
    /// Look the column up by name in the statement's column list
    #[default]
    Column,
    /// Assume the first quoted value of the statement is the role
    FirstQuoted,
}

impl std::str::FromStr for RoleStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "column" => Ok(RoleStrategy::Column),
            "first-quoted" | "first_quoted" => Ok(RoleStrategy::FirstQuoted),
            _ => Err(format!(
                "Unknown role strategy: {}. Valid options: column, first-quoted",
                s
            )),
        }
    }
}

impl std::fmt::Display for RoleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleStrategy::Column => write!(f, "column"),
            RoleStrategy::FirstQuoted => write!(f, "first-quoted"),
        }
    }
}

pub struct RoleRepair {
    strategy: RoleStrategy,
    tables: Vec<String>,
    column: String,
    allowed: AHashSet<String>,
    /// Quoted, escaped fallback ready to splice in
    fallback_literal: String,
}

impl RoleRepair {
    pub fn new(config: &RoleConfig) -> Self {
        Self {
            strategy: config.strategy,
            tables: config.tables.clone(),
            column: config.column.clone(),
            allowed: config.allowed.iter().cloned().collect(),
            fallback_literal: format!("'{}'", config.fallback.replace('\'', "''")),
        }
    }

    pub fn is_allowed(&self, value: &str) -> bool {
        self.allowed.contains(value)
    }

    fn applies_to(&self, stmt: &InsertStatement) -> bool {
        let name = stmt.table_name();
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    pub fn repair(&self, sql: &str) -> PassOutcome {
        let scan = scan_inserts(sql);
        let mut warnings = skipped_statements(Pass::Roles, &scan.unparsed);

        let mut edits = Vec::new();
        let mut checked = 0u64;

        for stmt in scan.statements.iter().filter(|s| self.applies_to(s)) {
            let targets: Vec<&ValueSpan> = match self.strategy {
                RoleStrategy::Column => match stmt.column_index(&self.column) {
                    Some(idx) => stmt.rows.iter().filter_map(|row| row.get(idx)).collect(),
                    None => {
                        warnings.push(ConvertWarning::RoleColumnMissing {
                            table: stmt.table.clone(),
                            column: self.column.clone(),
                        });
                        continue;
                    }
                },
                RoleStrategy::FirstQuoted => stmt
                    .rows
                    .first()
                    .and_then(|row| row.iter().find(|v| matches!(v.value, SqlValue::Str(_))))
                    .into_iter()
                    .collect(),
            };

            for span in targets {
                let SqlValue::Str(value) = &span.value else {
                    continue;
                };
                checked += 1;
                if !self.is_allowed(value) {
                    debug!(table = %stmt.table, value = %value, "role replaced");
                    edits.push(Edit::replace(span, self.fallback_literal.clone()));
                }
            }
        }

        let rewritten = edits.len() as u64;
        PassOutcome {
            sql: apply_edits(sql, edits),
            rewritten,
            checked,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repair(strategy: RoleStrategy) -> RoleRepair {
        RoleRepair::new(&RoleConfig {
            strategy,
            ..RoleConfig::default()
        })
    }

    #[test]
    fn test_invalid_role_replaced_by_name() {
        let sql = "INSERT INTO user (id, role, name) VALUES ('1', 'bogus', 'Alice');\n";
        let out = repair(RoleStrategy::Column).repair(sql);
        assert_eq!(
            out.sql,
            "INSERT INTO user (id, role, name) VALUES ('1', 'user', 'Alice');\n"
        );
        assert_eq!(out.rewritten, 1);
        assert_eq!(out.checked, 1);
    }

    #[test]
    fn test_allowed_roles_untouched() {
        let r = repair(RoleStrategy::Column);
        for role in crate::config::DEFAULT_ALLOWED_ROLES {
            let sql = format!("INSERT INTO user (role) VALUES ('{}');", role);
            assert_eq!(r.repair(&sql).sql, sql);
        }
    }

    #[test]
    fn test_role_column_at_any_position() {
        let sql = "INSERT INTO user (name, email, role) VALUES ('x', 'y', 'superuser'), ('a', 'b', 'admin');";
        let out = repair(RoleStrategy::Column).repair(sql);
        assert_eq!(
            out.sql,
            "INSERT INTO user (name, email, role) VALUES ('x', 'y', 'user'), ('a', 'b', 'admin');"
        );
    }

    #[test]
    fn test_null_and_other_tables_untouched() {
        let sql = "INSERT INTO user (role) VALUES (NULL);\nINSERT INTO post (role) VALUES ('bogus');\n";
        let out = repair(RoleStrategy::Column).repair(sql);
        assert_eq!(out.sql, sql);
        assert_eq!(out.checked, 0);
    }

    #[test]
    fn test_qualified_and_quoted_table_matches() {
        let sql = "INSERT INTO public.\"User\" (role) VALUES ('root');";
        let out = repair(RoleStrategy::Column).repair(sql);
        assert_eq!(out.sql, "INSERT INTO public.\"User\" (role) VALUES ('user');");
    }

    #[test]
    fn test_missing_role_column_warns() {
        let sql = "INSERT INTO user (id, name) VALUES ('1', 'bogus');";
        let out = repair(RoleStrategy::Column).repair(sql);
        assert_eq!(out.sql, sql);
        assert_eq!(out.warnings.len(), 1);
        assert!(matches!(out.warnings[0], ConvertWarning::RoleColumnMissing { .. }));
    }

    #[test]
    fn test_first_quoted_strategy() {
        let sql = "INSERT INTO user (role, name) VALUES ('bogus', 'bogus');";
        let out = repair(RoleStrategy::FirstQuoted).repair(sql);
        assert_eq!(out.sql, "INSERT INTO user (role, name) VALUES ('user', 'bogus');");

        // Positional guess is wrong when role is not first
        let sql = "INSERT INTO user (name, role) VALUES ('Alice', 'admin');";
        let out = repair(RoleStrategy::FirstQuoted).repair(sql);
        assert_eq!(out.sql, "INSERT INTO user (name, role) VALUES ('user', 'admin');");
    }

    #[test]
    fn test_fallback_is_escaped() {
        let r = RoleRepair::new(&RoleConfig {
            fallback: "o'neil".to_string(),
            allowed: vec!["o'neil".to_string()],
            ..RoleConfig::default()
        });
        let out = r.repair("INSERT INTO user (role) VALUES ('x');");
        assert_eq!(out.sql, "INSERT INTO user (role) VALUES ('o''neil');");
    }
}
