//! Cleanup passes applied after COPY conversion.
//!
//! Passes always run in the order convert → identifiers → booleans → roles,
//! whatever order the caller lists them in.

mod booleans;
mod identifiers;
mod roles;

pub use booleans::{BooleanMode, BooleanNormalizer};
pub use identifiers::IdentifierCleaner;
pub use roles::{RoleRepair, RoleStrategy};

use crate::convert::ConvertWarning;
use crate::parser::Unparsed;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A named pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    /// COPY blocks → INSERT statements
    Convert,
    /// Strip schema qualifiers
    Identifiers,
    /// 't' / 'f' → 1 / 0
    Booleans,
    /// Replace invalid role values
    Roles,
}

impl Pass {
    pub const ALL: [Pass; 4] = [Pass::Convert, Pass::Identifiers, Pass::Booleans, Pass::Roles];

    pub fn name(&self) -> &'static str {
        match self {
            Pass::Convert => "convert",
            Pass::Identifiers => "identifiers",
            Pass::Booleans => "booleans",
            Pass::Roles => "roles",
        }
    }
}

impl std::str::FromStr for Pass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "convert" => Ok(Pass::Convert),
            "identifiers" | "clean" => Ok(Pass::Identifiers),
            "booleans" | "bools" => Ok(Pass::Booleans),
            "roles" | "enum" => Ok(Pass::Roles),
            _ => Err(format!(
                "Unknown pass: {}. Valid options: convert, identifiers, booleans, roles",
                s
            )),
        }
    }
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Selected passes, deduplicated and kept in canonical order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Pass>", into = "Vec<Pass>")]
pub struct PassSet(Vec<Pass>);

impl PassSet {
    pub fn all() -> Self {
        Self(Pass::ALL.to_vec())
    }

    pub fn contains(&self, pass: Pass) -> bool {
        self.0.contains(&pass)
    }

    pub fn iter(&self) -> impl Iterator<Item = Pass> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PassSet {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Vec<Pass>> for PassSet {
    fn from(mut passes: Vec<Pass>) -> Self {
        passes.sort();
        passes.dedup();
        Self(passes)
    }
}

impl From<PassSet> for Vec<Pass> {
    fn from(set: PassSet) -> Self {
        set.0
    }
}

impl std::str::FromStr for PassSet {
    type Err = String;

    /// Parse a comma-separated list, or `all`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        let passes = s
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.parse::<Pass>())
            .collect::<Result<Vec<_>, _>>()?;
        if passes.is_empty() {
            return Err("No passes selected".to_string());
        }
        Ok(passes.into())
    }
}

impl std::fmt::Display for PassSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|p| p.name()).collect();
        write!(f, "{}", names.join(","))
    }
}

/// What a cleanup pass returns
#[derive(Debug, Default)]
pub struct PassOutcome {
    pub sql: String,
    /// Number of literals or prefixes rewritten
    pub rewritten: u64,
    /// Number of values inspected (roles pass)
    pub checked: u64,
    pub warnings: Vec<ConvertWarning>,
}

/// Report INSERT statements a pass could not parse and left unchanged
fn skipped_statements(pass: Pass, unparsed: &[Unparsed]) -> Vec<ConvertWarning> {
    unparsed
        .iter()
        .map(|u| {
            debug!(pass = %pass, offset = u.offset, reason = %u.reason, "statement skipped");
            ConvertWarning::SkippedStatement {
                pass: pass.to_string(),
                statement_preview: u.preview.clone(),
            }
        })
        .collect()
}
