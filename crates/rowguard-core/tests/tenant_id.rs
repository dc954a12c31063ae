#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rowguard_core::TenantId;

#[test]
fn accepts_opaque_ids() {
    for ok in ["t1", "acme-corp-x7k2p", "Tenant_42", "a b"] {
        assert_eq!(TenantId::parse(ok).unwrap().as_str(), ok);
    }
}

#[test]
fn rejects_malformed_ids() {
    let too_long = "x".repeat(256);
    for bad in ["", " t1", "t1 ", "t\n1", "t\u{0}1", too_long.as_str()] {
        let err = TenantId::parse(bad).expect_err("must fail");
        assert_eq!(err.code().as_str(), "BAD_REQUEST");
    }
}

#[test]
fn serde_goes_through_validation() {
    let ok: TenantId = serde_json::from_str("\"t1\"").unwrap();
    assert_eq!(ok.to_string(), "t1");
    assert_eq!(serde_json::to_string(&ok).unwrap(), "\"t1\"");
    assert!(serde_json::from_str::<TenantId>("\"\"").is_err());
}
