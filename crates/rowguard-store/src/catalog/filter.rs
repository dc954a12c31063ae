//! Caller-side row filters (the `WHERE` of a statement).
//!
//! These narrow a statement; the tenant policy is applied independently and
//! cannot be widened by any filter.

use serde_json::Value;

use rowguard_core::error::{Result, RowGuardError};

use super::row::Row;
use super::table::TableDef;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut v) => {
                v.push(other);
                Filter::And(v)
            }
            f => Filter::And(vec![f, other]),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::All => true,
            // NULL never compares equal
            Filter::Eq(col, v) => !v.is_null() && row.get(col) == Some(v),
            Filter::And(fs) => fs.iter().all(|f| f.matches(row)),
        }
    }

    /// Reject references to undeclared columns.
    pub fn validate(&self, def: &TableDef) -> Result<()> {
        match self {
            Filter::All => Ok(()),
            Filter::Eq(col, _) => {
                if def.has_column(col) {
                    Ok(())
                } else {
                    Err(RowGuardError::UnknownColumn {
                        table: def.name.clone(),
                        column: col.clone(),
                    })
                }
            }
            Filter::And(fs) => fs.iter().try_for_each(|f| f.validate(def)),
        }
    }
}
