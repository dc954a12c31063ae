//! Tenant identifiers, execution principals and access scopes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RowGuardError};

/// Maximum tenant identifier length (matches the `VARCHAR(255)` tenant column).
pub const MAX_TENANT_LEN: usize = 255;

/// Opaque tenant identifier.
///
/// Compared byte-for-byte (case-sensitive, no normalisation). Construction
/// rejects empty values, values longer than [`MAX_TENANT_LEN`], control
/// characters, and leading/trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(RowGuardError::BadRequest("tenant id must not be empty".into()));
        }
        if s.len() > MAX_TENANT_LEN {
            return Err(RowGuardError::BadRequest(format!(
                "tenant id longer than {MAX_TENANT_LEN} bytes"
            )));
        }
        if s.chars().any(char::is_control) {
            return Err(RowGuardError::BadRequest(
                "tenant id must not contain control characters".into(),
            ));
        }
        if s.trim() != s {
            return Err(RowGuardError::BadRequest(
                "tenant id must not have surrounding whitespace".into(),
            ));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = RowGuardError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<TenantId> for String {
    fn from(t: TenantId) -> Self {
        t.0
    }
}

impl std::str::FromStr for TenantId {
    type Err = RowGuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Execution principal of a unit of work (a store role).
///
/// `bypass_rls` comes from the role definition only; nothing carried in
/// request data can set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    role: String,
    bypass_rls: bool,
}

impl Principal {
    pub fn new(role: impl Into<String>, bypass_rls: bool) -> Self {
        Self {
            role: role.into(),
            bypass_rls,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn is_privileged(&self) -> bool {
        self.bypass_rls
    }

    /// Combine the principal with the session's current tenant.
    pub fn scope<'a>(&self, current_tenant: Option<&'a TenantId>) -> AccessScope<'a> {
        if self.bypass_rls {
            return AccessScope::Privileged;
        }
        match current_tenant {
            Some(t) => AccessScope::Tenant(t),
            None => AccessScope::Unset,
        }
    }
}

/// Authorization context a row predicate is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope<'a> {
    /// Principal bypasses the tenant filter.
    Privileged,
    /// Non-privileged, bound to one tenant.
    Tenant(&'a TenantId),
    /// Non-privileged, no tenant bound (fail-closed).
    Unset,
}

impl AccessScope<'_> {
    /// Label for logs and metrics. Never includes the tenant value.
    pub fn kind(&self) -> &'static str {
        match self {
            AccessScope::Privileged => "privileged",
            AccessScope::Tenant(_) => "tenant",
            AccessScope::Unset => "unset",
        }
    }
}
