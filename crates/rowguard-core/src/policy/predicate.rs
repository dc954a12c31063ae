use crate::error::ErrorCode;
use crate::tenant::AccessScope;

/// Decision from row policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Pass,
    /// Existing row is invisible to the scope. Not an error.
    Filter,
    /// New row image is not writable by the scope.
    Reject { code: ErrorCode, msg: &'static str },
}

impl PolicyDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, PolicyDecision::Pass)
    }
}

/// `privileged OR row_tenant = current_tenant`.
///
/// A missing row tenant or an unset current tenant never matches, the same
/// way `NULL = x` is never true in SQL.
pub fn tenant_matches(scope: AccessScope<'_>, row_tenant: Option<&str>) -> bool {
    match scope {
        AccessScope::Privileged => true,
        AccessScope::Tenant(current) => row_tenant == Some(current.as_str()),
        AccessScope::Unset => false,
    }
}

/// `USING` clause: decides visibility of an existing row.
pub fn check_using(scope: AccessScope<'_>, row_tenant: Option<&str>) -> PolicyDecision {
    if tenant_matches(scope, row_tenant) {
        PolicyDecision::Pass
    } else {
        PolicyDecision::Filter
    }
}

/// `WITH CHECK` clause: decides whether a new row image may be written.
pub fn check_with_check(scope: AccessScope<'_>, row_tenant: Option<&str>) -> PolicyDecision {
    if tenant_matches(scope, row_tenant) {
        return PolicyDecision::Pass;
    }
    let msg = match scope {
        AccessScope::Unset => "no current tenant bound",
        _ => "row tenant does not match current tenant",
    };
    PolicyDecision::Reject {
        code: ErrorCode::PolicyViolation,
        msg,
    }
}
