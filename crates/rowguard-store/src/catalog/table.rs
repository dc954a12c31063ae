use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockWriteGuard};

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::ident::validate_identifier;

use crate::config::{RlsSection, TableConfig};
use crate::policy::TablePolicyRuntime;

use super::row::{Row, RowId};

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Declared shape of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<String>,
    pub row_security: bool,
    /// Engine-maintained `created_at` / `updated_at`.
    pub timestamps: bool,
}

impl TableDef {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            row_security: false,
            timestamps: false,
        }
    }

    pub fn with_row_security(mut self) -> Self {
        self.row_security = true;
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

impl From<&TableConfig> for TableDef {
    fn from(c: &TableConfig) -> Self {
        Self {
            name: c.name.clone(),
            columns: c.columns.clone(),
            row_security: c.row_security,
            timestamps: c.timestamps,
        }
    }
}

/// Compiled table: definition, policy runtime, committed rows.
#[derive(Debug)]
pub struct Table {
    pub def: TableDef,
    pub policy: TablePolicyRuntime,
    rows: RwLock<BTreeMap<RowId, Row>>,
}

impl Table {
    pub fn compile(mut def: TableDef, rls: &RlsSection) -> Result<Self> {
        validate_identifier("table name", &def.name)?;
        if def.columns.is_empty() {
            return Err(RowGuardError::BadRequest(format!(
                "table {} must declare at least one column",
                def.name
            )));
        }
        let mut seen = HashSet::new();
        for c in &def.columns {
            validate_identifier("column name", c)?;
            if !seen.insert(c.as_str()) {
                return Err(RowGuardError::BadRequest(format!(
                    "duplicate column {c} in table {}",
                    def.name
                )));
            }
        }
        if def.timestamps {
            for c in [CREATED_AT, UPDATED_AT] {
                if !def.has_column(c) {
                    def.columns.push(c.to_string());
                }
            }
        }

        let tenant_column = def
            .has_column(&rls.tenant_column)
            .then(|| rls.tenant_column.clone());
        let policy = TablePolicyRuntime::new(def.name.clone(), tenant_column, def.row_security)?;

        Ok(Self {
            def,
            policy,
            rows: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Tenant column, present on tenant-scoped tables whether or not row
    /// security is currently enabled.
    pub fn tenant_column(&self) -> Option<&str> {
        self.policy.tenant_column()
    }

    /// Copy of the committed rows.
    pub fn snapshot(&self) -> Result<BTreeMap<RowId, Row>> {
        // Poisoned lock means logic bug; surface it instead of panicking.
        self.rows
            .read()
            .map(|g| g.clone())
            .map_err(|_| RowGuardError::Internal(format!("table {} lock poisoned", self.def.name)))
    }

    pub fn write_rows(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<RowId, Row>>> {
        self.rows
            .write()
            .map_err(|_| RowGuardError::Internal(format!("table {} lock poisoned", self.def.name)))
    }
}
