//! Tenant row policy: the per-row predicate and its SQL rendering.
//!
//! The predicate is the same for every statement kind; what differs is which
//! image it guards. `USING` hides existing rows (select, update pre-image,
//! delete) and `WITH CHECK` rejects new rows (insert, update post-image).

pub mod predicate;
pub mod sql;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use predicate::{check_using, check_with_check, tenant_matches, PolicyDecision};
pub use sql::{render_script, PolicySet, SessionStatements};

/// Data statement kinds a policy is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub const ALL: [StatementKind; 4] = [
        StatementKind::Select,
        StatementKind::Insert,
        StatementKind::Update,
        StatementKind::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }

    pub fn sql_keyword(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }

    /// Existing rows are filtered by `USING`.
    pub fn has_using(self) -> bool {
        !matches!(self, StatementKind::Insert)
    }

    /// New row images are checked by `WITH CHECK`.
    pub fn has_with_check(self) -> bool {
        matches!(self, StatementKind::Insert | StatementKind::Update)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
