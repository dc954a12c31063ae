use std::sync::atomic::{AtomicBool, Ordering};

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::policy::{check_using, check_with_check, PolicyDecision, PolicySet};
use rowguard_core::AccessScope;

use crate::catalog::row::{Row, Values};

/// Table-scoped policy runtime.
/// Construct once when the table is defined, then share via the table handle.
#[derive(Debug)]
pub struct TablePolicyRuntime {
    pub table: String,

    // None => table carries no tenant column and can never enable row security
    tenant_column: Option<String>,
    enabled: AtomicBool,
}

impl TablePolicyRuntime {
    pub fn new(table: String, tenant_column: Option<String>, row_security: bool) -> Result<Self> {
        if row_security && tenant_column.is_none() {
            return Err(misconfigured(&table));
        }
        Ok(Self {
            table,
            tenant_column,
            enabled: AtomicBool::new(row_security),
        })
    }

    pub fn tenant_column(&self) -> Option<&str> {
        self.tenant_column.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, on: bool) -> Result<()> {
        if on && self.tenant_column.is_none() {
            return Err(misconfigured(&self.table));
        }
        self.enabled.store(on, Ordering::Release);
        Ok(())
    }

    /// Freeze the policy for one statement. A concurrent toggle applies to
    /// the next statement, never halfway through this one.
    pub fn for_statement<'a>(&'a self, scope: AccessScope<'a>) -> StatementPolicy<'a> {
        let column = if self.is_enabled() {
            self.tenant_column.as_deref()
        } else {
            None
        };
        StatementPolicy { column, scope }
    }

    pub fn policy_set(&self, setting_name: &str) -> Result<PolicySet> {
        let col = self
            .tenant_column
            .as_deref()
            .ok_or_else(|| misconfigured(&self.table))?;
        PolicySet::for_table(&self.table, col, setting_name)
    }
}

/// Policy as seen by a single statement.
#[derive(Debug, Clone, Copy)]
pub struct StatementPolicy<'a> {
    column: Option<&'a str>,
    scope: AccessScope<'a>,
}

impl StatementPolicy<'_> {
    pub fn enforced(&self) -> bool {
        self.column.is_some()
    }

    pub fn scope_kind(&self) -> &'static str {
        self.scope.kind()
    }

    /// `USING` on an existing row.
    pub fn using(&self, row: &Row) -> PolicyDecision {
        match self.column {
            None => PolicyDecision::Pass,
            Some(col) => check_using(self.scope, row.get_str(col)),
        }
    }

    /// `WITH CHECK` on a new row image.
    pub fn with_check(&self, values: &Values) -> PolicyDecision {
        match self.column {
            None => PolicyDecision::Pass,
            Some(col) => check_with_check(self.scope, values.get(col).and_then(|v| v.as_str())),
        }
    }
}

fn misconfigured(table: &str) -> RowGuardError {
    RowGuardError::Misconfigured(format!(
        "row security on table {table} requires the tenant column"
    ))
}
