//! Shared store handle.
//!
//! Owns the table catalog, role registry, connection slots and metrics.
//! Cheap to clone; every clone refers to the same storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::policy::PolicySet;

use crate::catalog::{Catalog, Table, TableDef};
use crate::config::{RlsSection, StoreConfig};
use crate::context::RoleRegistry;
use crate::obs::StoreMetrics;
use crate::pool::SlotPool;
use crate::uow::UnitOfWork;

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    cfg: StoreConfig,
    catalog: Catalog,
    roles: RoleRegistry,
    pool: SlotPool,
    metrics: StoreMetrics,
    next_row_id: AtomicU64,
    next_uow_id: AtomicU64,
}

impl Store {
    /// Build the store and compile every configured table.
    /// Misconfigured tables fail here, before any traffic.
    pub fn new(cfg: StoreConfig) -> Result<Self> {
        cfg.validate()?;

        let catalog = Catalog::new();
        for tc in &cfg.tables {
            let def = TableDef::from(tc);
            let table = Table::compile(def, &cfg.rls).map_err(|e| match e {
                RowGuardError::Misconfigured(m) => RowGuardError::Misconfigured(m),
                other => RowGuardError::BadRequest(format!(
                    "table definition failed (table={}): {other}",
                    tc.name
                )),
            })?;
            warn_if_unprotected(&table);
            catalog.insert(table)?;
        }

        let roles = RoleRegistry::from_config(&cfg.roles);
        let pool = SlotPool::new(&cfg.pool);

        tracing::info!(
            tables = cfg.tables.len(),
            roles = cfg.roles.len(),
            slots = pool.capacity(),
            tenant_column = %cfg.rls.tenant_column,
            "store ready"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                cfg,
                catalog,
                roles,
                pool,
                metrics: StoreMetrics::default(),
                next_row_id: AtomicU64::new(1),
                next_uow_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn cfg(&self) -> &StoreConfig {
        &self.inner.cfg
    }

    pub fn rls(&self) -> &RlsSection {
        &self.inner.cfg.rls
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.inner.metrics
    }

    pub fn available_slots(&self) -> usize {
        self.inner.pool.available()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.inner.catalog.names()
    }

    /// Register a record type at runtime.
    pub fn define_table(&self, def: TableDef) -> Result<()> {
        let table = Table::compile(def, &self.inner.cfg.rls)?;
        warn_if_unprotected(&table);
        tracing::info!(table = %table.name(), row_security = table.policy.is_enabled(), "table defined");
        self.inner.catalog.insert(table)
    }

    pub fn row_security_enabled(&self, table: &str) -> Result<bool> {
        Ok(self.inner.catalog.get(table)?.policy.is_enabled())
    }

    /// Turn the tenant filter on. Privileged roles only.
    pub fn enable_row_security(&self, role: &str, table: &str) -> Result<()> {
        self.toggle_row_security(role, table, true)
    }

    /// Turn the tenant filter off (debugging). Privileged roles only.
    pub fn disable_row_security(&self, role: &str, table: &str) -> Result<()> {
        self.toggle_row_security(role, table, false)
    }

    /// Start a unit of work as `role`. Waits for a free connection slot.
    pub async fn begin(&self, role: &str) -> Result<UnitOfWork> {
        let principal = self.inner.roles.resolve(role)?;
        let slot = self.inner.pool.acquire().await?;
        Ok(UnitOfWork::new(self.clone(), principal, slot))
    }

    pub fn policy_set(&self, table: &str) -> Result<PolicySet> {
        self.inner
            .catalog
            .get(table)?
            .policy
            .policy_set(&self.inner.cfg.rls.setting_name)
    }

    /// Policy definitions for every table with row security enabled.
    pub fn policy_sets(&self) -> Result<Vec<PolicySet>> {
        let mut out = Vec::new();
        for name in self.inner.catalog.names() {
            let t = self.inner.catalog.get(&name)?;
            if t.policy.is_enabled() {
                out.push(t.policy.policy_set(&self.inner.cfg.rls.setting_name)?);
            }
        }
        Ok(out)
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub(crate) fn next_row_id(&self) -> crate::catalog::RowId {
        crate::catalog::RowId(self.inner.next_row_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_uow_id(&self) -> u64 {
        self.inner.next_uow_id.fetch_add(1, Ordering::Relaxed)
    }

    fn toggle_row_security(&self, role: &str, table: &str, on: bool) -> Result<()> {
        let principal = self.inner.roles.resolve_privileged(role)?;
        let t = self.inner.catalog.get(table)?;
        t.policy.set_enabled(on)?;
        tracing::warn!(table, role = %principal.role(), enabled = on, "row security toggled");
        Ok(())
    }
}

fn warn_if_unprotected(table: &Table) {
    if table.tenant_column().is_some() && !table.policy.is_enabled() {
        tracing::warn!(table = %table.name(), "tenant column present but row security disabled");
    }
}
