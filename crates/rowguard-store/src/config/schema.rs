use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::ident::{validate_identifier, validate_setting_name};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub version: u32,

    #[serde(default)]
    pub rls: RlsSection,

    #[serde(default)]
    pub pool: PoolSection,

    #[serde(default = "default_roles")]
    pub roles: Vec<RoleConfig>,

    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl StoreConfig {
    /// Version 1 config with every section at its default.
    pub fn minimal() -> Self {
        Self {
            version: 1,
            rls: RlsSection::default(),
            pool: PoolSection::default(),
            roles: default_roles(),
            tables: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RowGuardError::UnsupportedVersion);
        }
        if self.roles.is_empty() {
            return Err(RowGuardError::BadRequest("roles must not be empty".into()));
        }

        self.rls.validate()?;
        self.pool.validate()?;

        let mut seen = HashSet::new();
        for r in &self.roles {
            validate_identifier("role name", &r.name)?;
            if !seen.insert(r.name.as_str()) {
                return Err(RowGuardError::BadRequest(format!("duplicate role: {}", r.name)));
            }
        }

        let mut seen = HashSet::new();
        for t in &self.tables {
            if !seen.insert(t.name.as_str()) {
                return Err(RowGuardError::BadRequest(format!("duplicate table: {}", t.name)));
            }
        }

        Ok(())
    }
}

/// Names the tenant policy is parameterised by.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RlsSection {
    #[serde(default = "default_tenant_column")]
    pub tenant_column: String,

    #[serde(default = "default_setting_name")]
    pub setting_name: String,
}

impl Default for RlsSection {
    fn default() -> Self {
        Self {
            tenant_column: default_tenant_column(),
            setting_name: default_setting_name(),
        }
    }
}

impl RlsSection {
    pub fn validate(&self) -> Result<()> {
        validate_identifier("rls.tenant_column", &self.tenant_column)?;
        validate_setting_name(&self.setting_name)?;
        Ok(())
    }
}

fn default_tenant_column() -> String {
    "tenant_id".into()
}
fn default_setting_name() -> String {
    "app.current_tenant".into()
}

/// Connection slots shared by all units of work.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolSection {
    #[serde(default = "default_pool_size")]
    pub size: usize,

    #[serde(default = "default_max_overflow")]
    pub max_overflow: usize,

    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
            max_overflow: default_max_overflow(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl PoolSection {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(RowGuardError::BadRequest("pool.size must be at least 1".into()));
        }
        if self.capacity() > 10_000 {
            return Err(RowGuardError::BadRequest(
                "pool.size + pool.max_overflow must not exceed 10000".into(),
            ));
        }
        if !(1..=600_000).contains(&self.acquire_timeout_ms) {
            return Err(RowGuardError::BadRequest(
                "pool.acquire_timeout_ms must be between 1 and 600000".into(),
            ));
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.size + self.max_overflow
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

fn default_pool_size() -> usize {
    10
}
fn default_max_overflow() -> usize {
    20
}
fn default_acquire_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub name: String,
    #[serde(default)]
    pub bypass_rls: bool,
}

fn default_roles() -> Vec<RoleConfig> {
    vec![
        RoleConfig { name: "app".into(), bypass_rls: false },
        RoleConfig { name: "admin".into(), bypass_rls: true },
    ]
}

/// Declared record type. Column checks happen when the table is compiled.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub row_security: bool,
    #[serde(default)]
    pub timestamps: bool,
}
