//! Strip schema qualifiers from INSERT INTO / COPY targets.

use super::PassOutcome;
use crate::error::{Error, Result};
use regex::Regex;
use tracing::debug;

pub struct IdentifierCleaner {
    /// None when no schemas are configured
    re: Option<Regex>,
}

impl IdentifierCleaner {
    pub fn new(schemas: &[String]) -> Result<Self> {
        if schemas.is_empty() {
            return Ok(Self { re: None });
        }

        let names = schemas
            .iter()
            .map(|s| regex::escape(s.trim()))
            .collect::<Vec<_>>()
            .join("|");
        // Stacked qualifiers are removed in one match so a second run is a no-op
        let pattern = format!(
            r#"(^|[;\n])([ \t\r]*)((?i:INSERT\s+INTO|COPY))(\s+)(?:(?:"(?:{names})"|(?:{names}))\s*\.\s*)+"#
        );
        let re = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid schema name: {}", e)))?;
        Ok(Self { re: Some(re) })
    }

    pub fn clean(&self, sql: &str) -> PassOutcome {
        let Some(re) = &self.re else {
            return PassOutcome {
                sql: sql.to_string(),
                ..Default::default()
            };
        };

        let rewritten = re.find_iter(sql).count() as u64;
        let cleaned = re.replace_all(sql, "${1}${2}${3}${4}").into_owned();
        debug!(rewritten, "schema qualifiers stripped");

        PassOutcome {
            sql: cleaned,
            rewritten,
            ..Default::default()
        }
    }
}
