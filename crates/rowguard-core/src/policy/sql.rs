//! Postgres rendering of the tenant row policy.
//!
//! Produces the `ENABLE ROW LEVEL SECURITY` statement and the four
//! per-statement `CREATE POLICY` definitions for a table, plus the
//! `SET LOCAL` / `RESET` pair an external SQL session uses to bind a tenant.
//! The script must be applied by a superuser.

use std::fmt::Write;

use crate::error::Result;
use crate::ident::{quote_literal, validate_identifier, validate_setting_name};
use crate::policy::StatementKind;
use crate::tenant::TenantId;

/// Session flag Postgres sets for superuser connections.
const SUPERUSER_SETTING: &str = "is_superuser";

/// Policy definitions for one tenant-scoped table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    table: String,
    tenant_column: String,
    setting_name: String,
}

impl PolicySet {
    pub fn for_table(table: &str, tenant_column: &str, setting_name: &str) -> Result<Self> {
        validate_identifier("table name", table)?;
        validate_identifier("tenant column", tenant_column)?;
        validate_setting_name(setting_name)?;
        Ok(Self {
            table: table.to_string(),
            tenant_column: tenant_column.to_string(),
            setting_name: setting_name.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn policy_name(&self, kind: StatementKind) -> String {
        format!("{}_{}_policy", self.table, kind.as_str())
    }

    /// The shared predicate. `current_setting(_, true)` yields NULL when the
    /// setting is absent, so an unbound session matches nothing.
    pub fn predicate_sql(&self) -> String {
        format!(
            "current_setting('{SUPERUSER_SETTING}', true) = 'on' OR {} = current_setting('{}', true)",
            self.tenant_column, self.setting_name
        )
    }

    pub fn enable_statement(&self) -> String {
        format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY;", self.table)
    }

    pub fn disable_statement(&self) -> String {
        format!("ALTER TABLE {} DISABLE ROW LEVEL SECURITY;", self.table)
    }

    pub fn create_statement(&self, kind: StatementKind) -> String {
        let pred = self.predicate_sql();
        let mut out = format!(
            "CREATE POLICY {} ON {}\n    FOR {}",
            self.policy_name(kind),
            self.table,
            kind.sql_keyword()
        );
        if kind.has_using() {
            let _ = write!(out, "\n    USING ({pred})");
        }
        if kind.has_with_check() {
            let _ = write!(out, "\n    WITH CHECK ({pred})");
        }
        out.push(';');
        out
    }

    /// Enable statement followed by the four policies.
    pub fn create_statements(&self) -> Vec<String> {
        std::iter::once(self.enable_statement())
            .chain(StatementKind::ALL.iter().map(|k| self.create_statement(*k)))
            .collect()
    }

    pub fn drop_statements(&self) -> Vec<String> {
        StatementKind::ALL
            .iter()
            .map(|k| format!("DROP POLICY IF EXISTS {} ON {};", self.policy_name(*k), self.table))
            .collect()
    }

    /// Script section for this table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "-- table: {}", self.table);
        let _ = writeln!(out, "--   tenant column:    {}", self.tenant_column);
        let _ = writeln!(out, "--   session setting:  {}", self.setting_name);
        for stmt in self.create_statements() {
            let _ = writeln!(out, "\n{stmt}");
        }
        let _ = writeln!(out, "\n-- rollback:");
        let _ = writeln!(out, "--   {}", self.disable_statement());
        for stmt in self.drop_statements() {
            let _ = writeln!(out, "--   {stmt}");
        }
        out
    }
}

/// Render a complete script for several tables.
pub fn render_script(sets: &[PolicySet]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "-- Row level security policies for tenant-scoped tables.");
    let _ = writeln!(out, "-- Apply as a superuser. Sessions must run");
    let _ = writeln!(out, "--   SET LOCAL <setting> = '<tenant>';");
    let _ = writeln!(out, "-- inside each transaction before touching these tables.");
    for set in sets {
        let _ = writeln!(out);
        out.push_str(&set.render());
    }
    out
}

/// Statements an external SQL session runs to bind and release a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatements {
    setting_name: String,
}

impl SessionStatements {
    pub fn new(setting_name: &str) -> Result<Self> {
        validate_setting_name(setting_name)?;
        Ok(Self {
            setting_name: setting_name.to_string(),
        })
    }

    /// Transaction-scoped binding; released automatically at commit/rollback.
    pub fn set_local(&self, tenant: &TenantId) -> String {
        format!(
            "SET LOCAL {} = {};",
            self.setting_name,
            quote_literal(tenant.as_str())
        )
    }

    pub fn reset(&self) -> String {
        format!("RESET {};", self.setting_name)
    }
}
