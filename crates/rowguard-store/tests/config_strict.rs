#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rowguard_store::{config, Store};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
rls:
  tenant_colum: "org_id" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.rls.tenant_column, "tenant_id");
    assert_eq!(cfg.rls.setting_name, "app.current_tenant");
    assert_eq!(cfg.pool.capacity(), 30);
    assert_eq!(cfg.roles.len(), 2);
    assert!(cfg.roles.iter().any(|r| r.name == "admin" && r.bypass_rls));
    assert!(cfg.roles.iter().any(|r| r.name == "app" && !r.bypass_rls));
}

#[test]
fn rejects_other_versions() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn rejects_bad_setting_name_and_column() {
    let bad = "version: 1\nrls:\n  setting_name: current_tenant\n";
    assert!(config::load_from_str(bad).is_err());

    let bad = "version: 1\nrls:\n  tenant_column: \"tenant-id\"\n";
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn rejects_duplicate_roles_and_tables() {
    let bad = r#"
version: 1
roles:
  - { name: app }
  - { name: app, bypass_rls: true }
"#;
    assert!(config::load_from_str(bad).is_err());

    let bad = r#"
version: 1
tables:
  - { name: companies, columns: [tenant_id] }
  - { name: companies, columns: [tenant_id, name] }
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn row_security_without_tenant_column_is_misconfigured() {
    let cfg = config::load_from_str(
        r#"
version: 1
tables:
  - name: projects
    columns: [org, title]
    row_security: true
"#,
    )
    .expect("schema itself is valid");

    let err = Store::new(cfg).err().expect("must fail at definition");
    assert_eq!(err.code().as_str(), "MISCONFIGURED");
}

#[test]
fn custom_tenant_column_compiles() {
    let cfg = config::load_from_str(
        r#"
version: 1
rls:
  tenant_column: org_id
  setting_name: acme.org
tables:
  - name: projects
    columns: [org_id, title]
    row_security: true
    timestamps: true
"#,
    )
    .unwrap();

    let store = Store::new(cfg).unwrap();
    assert!(store.row_security_enabled("projects").unwrap());
    let set = store.policy_set("projects").unwrap();
    assert!(set.predicate_sql().contains("org_id = current_setting('acme.org', true)"));
}
