//! Companies: one per tenant, created when the tenant is onboarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::TenantId;

use crate::catalog::{Filter, Values};
use crate::config::RlsSection;
use crate::uow::UnitOfWork;

use super::TenantAware;

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl CompanyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Inactive => "inactive",
            CompanyStatus::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub tenant_id: TenantId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub status: CompanyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantAware for Company {
    const TABLE: &'static str = "companies";
    const DATA_COLUMNS: &'static [&'static str] = &["name", "display_name", "description", "status"];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewCompany {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCompany {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RowGuardError::BadRequest("company name must not be empty".into()));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(RowGuardError::BadRequest(format!(
                "company name longer than {MAX_NAME_LEN} characters"
            )));
        }
        if let Some(d) = &self.display_name {
            if d.chars().count() > MAX_NAME_LEN {
                return Err(RowGuardError::BadRequest(format!(
                    "display name longer than {MAX_NAME_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

/// Company queries on a unit of work. Every call goes through the tenant
/// filter of the `companies` table.
pub struct Companies<'u> {
    uow: &'u mut UnitOfWork,
    tenant_column: String,
}

impl<'u> Companies<'u> {
    pub fn new(uow: &'u mut UnitOfWork, rls: &RlsSection) -> Self {
        Self {
            uow,
            tenant_column: rls.tenant_column.clone(),
        }
    }

    /// Insert the company of `tenant`. A tenant has at most one company.
    pub fn create(&mut self, tenant: &TenantId, new: NewCompany) -> Result<Company> {
        new.validate()?;
        if self.get(tenant)?.is_some() {
            return Err(RowGuardError::Conflict(format!(
                "company already registered for tenant {tenant}"
            )));
        }

        let mut values = Values::new();
        values.insert(self.tenant_column.clone(), Value::String(tenant.to_string()));
        values.insert("name".into(), Value::String(new.name));
        values.insert("display_name".into(), new.display_name.into());
        values.insert("description".into(), new.description.into());
        values.insert("status".into(), CompanyStatus::Active.as_str().into());

        let id = self.uow.insert(Company::TABLE, values)?;
        let row = self
            .uow
            .select(Company::TABLE, &self.tenant_filter(tenant))?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RowGuardError::Internal(format!("inserted company row {id} not readable")))?;
        Company::from_row(&row, &self.tenant_column)
    }

    pub fn list(&self) -> Result<Vec<Company>> {
        self.query(&Filter::All)
    }

    pub fn get(&self, tenant: &TenantId) -> Result<Option<Company>> {
        Ok(self.query(&self.tenant_filter(tenant))?.into_iter().next())
    }

    /// The active company visible in this scope, if exactly one.
    pub fn find_active(&self) -> Result<Option<Company>> {
        let mut found = self.query(&Filter::eq("status", CompanyStatus::Active.as_str()))?;
        if found.len() > 1 {
            return Err(RowGuardError::Conflict(format!(
                "{} active companies visible, expected at most one",
                found.len()
            )));
        }
        Ok(found.pop())
    }

    pub fn set_status(&mut self, tenant: &TenantId, status: CompanyStatus) -> Result<u64> {
        let mut patch = Values::new();
        patch.insert("status".into(), status.as_str().into());
        let filter = self.tenant_filter(tenant);
        self.uow.update(Company::TABLE, &filter, patch)
    }

    pub fn remove(&mut self, tenant: &TenantId) -> Result<u64> {
        let filter = self.tenant_filter(tenant);
        self.uow.delete(Company::TABLE, &filter)
    }

    fn tenant_filter(&self, tenant: &TenantId) -> Filter {
        Filter::eq(self.tenant_column.clone(), tenant.as_str())
    }

    fn query(&self, filter: &Filter) -> Result<Vec<Company>> {
        self.uow
            .select(Company::TABLE, filter)?
            .iter()
            .map(|r| Company::from_row(r, &self.tenant_column))
            .collect()
    }
}
