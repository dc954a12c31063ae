//! Tenant row predicate: USING / WITH CHECK decisions.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rowguard_core::policy::{check_using, check_with_check, tenant_matches, PolicyDecision};
use rowguard_core::{AccessScope, Principal, TenantId};

fn t(s: &str) -> TenantId {
    TenantId::parse(s).unwrap()
}

#[test]
fn tenant_scope_sees_only_its_rows() {
    let t1 = t("t1");
    let scope = AccessScope::Tenant(&t1);
    assert!(tenant_matches(scope, Some("t1")));
    assert!(!tenant_matches(scope, Some("t2")));
    assert!(!tenant_matches(scope, None));
}

#[test]
fn comparison_is_case_sensitive() {
    let acme = t("Acme");
    assert!(!tenant_matches(AccessScope::Tenant(&acme), Some("acme")));
}

#[test]
fn unset_scope_fails_closed() {
    assert_eq!(check_using(AccessScope::Unset, Some("t1")), PolicyDecision::Filter);
    assert_eq!(check_using(AccessScope::Unset, None), PolicyDecision::Filter);
    match check_with_check(AccessScope::Unset, Some("t1")) {
        PolicyDecision::Reject { code, msg } => {
            assert_eq!(code.as_str(), "POLICY_VIOLATION");
            assert_eq!(msg, "no current tenant bound");
        }
        other => panic!("expected reject, got {other:?}"),
    }
}

#[test]
fn privileged_scope_passes_everything() {
    assert!(check_using(AccessScope::Privileged, Some("t9")).is_pass());
    assert!(check_using(AccessScope::Privileged, None).is_pass());
    assert!(check_with_check(AccessScope::Privileged, Some("t9")).is_pass());
}

#[test]
fn mismatched_write_is_rejected_not_filtered() {
    let t1 = t("t1");
    let d = check_with_check(AccessScope::Tenant(&t1), Some("t2"));
    assert!(matches!(d, PolicyDecision::Reject { .. }));
    assert_eq!(check_using(AccessScope::Tenant(&t1), Some("t2")), PolicyDecision::Filter);
}

#[test]
fn principal_scope_ignores_tenant_when_privileged() {
    let t1 = t("t1");
    let admin = Principal::new("admin", true);
    let app = Principal::new("app", false);

    assert_eq!(admin.scope(None), AccessScope::Privileged);
    assert_eq!(admin.scope(Some(&t1)), AccessScope::Privileged);
    assert_eq!(app.scope(None), AccessScope::Unset);
    assert_eq!(app.scope(Some(&t1)), AccessScope::Tenant(&t1));
    assert_eq!(app.scope(None).kind(), "unset");
}
