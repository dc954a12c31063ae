//! Tenant-aware record types.
//!
//! A [`TenantAware`] type maps to a table that carries the configured tenant
//! column, engine-maintained timestamps, and row security.

pub mod company;

use serde::de::DeserializeOwned;
use serde_json::Value;

use rowguard_core::error::{Result, RowGuardError};

use crate::catalog::{Row, TableDef};
use crate::config::RlsSection;

pub use company::{Companies, Company, CompanyStatus, NewCompany};

/// Field name tenant-aware types use for the tenant, whatever the column is called.
pub const TENANT_FIELD: &str = "tenant_id";

pub trait TenantAware: DeserializeOwned {
    const TABLE: &'static str;

    /// Columns other than the tenant column and timestamps.
    const DATA_COLUMNS: &'static [&'static str];

    fn table_def(rls: &RlsSection) -> TableDef {
        let columns = std::iter::once(rls.tenant_column.clone())
            .chain(Self::DATA_COLUMNS.iter().map(|c| c.to_string()));
        TableDef::new(Self::TABLE, columns)
            .with_row_security()
            .with_timestamps()
    }

    fn from_row(row: &Row, tenant_column: &str) -> Result<Self> {
        let mut values = row.values.clone();
        if tenant_column != TENANT_FIELD {
            if let Some(t) = values.remove(tenant_column) {
                values.insert(TENANT_FIELD.to_string(), t);
            }
        }
        serde_json::from_value(Value::Object(values)).map_err(|e| {
            RowGuardError::Internal(format!("row {} of {} does not decode: {e}", row.id, Self::TABLE))
        })
    }
}
