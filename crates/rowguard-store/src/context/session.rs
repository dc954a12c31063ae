use std::collections::HashMap;

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::{AccessScope, Principal, TenantId};

use crate::config::RoleConfig;

/// Per-unit-of-work session state (the `app.current_tenant` equivalent).
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    current_tenant: Option<TenantId>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the current tenant. Returns false when the same tenant was
    /// already bound (no-op).
    pub fn set_current_tenant(&mut self, tenant: TenantId) -> bool {
        if self.current_tenant.as_ref() == Some(&tenant) {
            return false;
        }
        self.current_tenant = Some(tenant);
        true
    }

    pub fn reset(&mut self) {
        self.current_tenant = None;
    }

    pub fn current_tenant(&self) -> Option<&TenantId> {
        self.current_tenant.as_ref()
    }

    pub fn scope<'a>(&'a self, principal: &Principal) -> AccessScope<'a> {
        principal.scope(self.current_tenant.as_ref())
    }
}

/// Roles known to the store, compiled from config.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: HashMap<String, Principal>,
}

impl RoleRegistry {
    pub fn from_config(roles: &[RoleConfig]) -> Self {
        let roles = roles
            .iter()
            .map(|r| (r.name.clone(), Principal::new(r.name.clone(), r.bypass_rls)))
            .collect();
        Self { roles }
    }

    pub fn resolve(&self, role: &str) -> Result<Principal> {
        self.roles
            .get(role)
            .cloned()
            .ok_or_else(|| RowGuardError::UnknownRole(role.to_string()))
    }

    /// Resolve and require the privileged flag.
    pub fn resolve_privileged(&self, role: &str) -> Result<Principal> {
        let p = self.resolve(role)?;
        if !p.is_privileged() {
            return Err(RowGuardError::NotAuthorized(format!(
                "role {role} may not change row security"
            )));
        }
        Ok(p)
    }
}
