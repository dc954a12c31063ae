//! Tenant-bound sessions for request handlers.
//!
//! The caller passes the tenant it resolved for the request (for example from
//! a verified token). Sessions are refused when there is none, so a handler
//! can never fall through to an unscoped unit of work by accident.

use futures_util::future::BoxFuture;

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::TenantId;

use crate::store::Store;
use crate::uow::UnitOfWork;

#[derive(Clone)]
pub struct SessionManager {
    store: Store,
    role: String,
}

impl SessionManager {
    pub fn new(store: Store, role: impl Into<String>) -> Self {
        Self {
            store,
            role: role.into(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Begin a unit of work with `tenant` already bound.
    pub async fn session(&self, tenant: Option<TenantId>) -> Result<UnitOfWork> {
        let tenant = tenant.ok_or(RowGuardError::MissingTenant)?;
        let mut uow = self.store.begin(&self.role).await?;
        uow.set_current_tenant(tenant);
        Ok(uow)
    }

    /// Run `f` in a tenant-bound unit of work. Commits when `f` succeeds and
    /// rolls back when it fails.
    pub async fn run<T, F>(&self, tenant: Option<TenantId>, f: F) -> Result<T>
    where
        T: Send,
        F: for<'u> FnOnce(&'u mut UnitOfWork) -> BoxFuture<'u, Result<T>>,
    {
        let mut uow = self.session(tenant).await?;
        let res = f(&mut uow).await;
        match res {
            Ok(v) => {
                uow.commit()?;
                Ok(v)
            }
            Err(e) => {
                uow.rollback();
                Err(e)
            }
        }
    }
}
