//! SQL rendering of tenant row policies.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rowguard_core::policy::{render_script, PolicySet, SessionStatements};
use rowguard_core::{StatementKind, TenantId};

fn companies() -> PolicySet {
    PolicySet::for_table("companies", "tenant_id", "app.current_tenant").unwrap()
}

#[test]
fn predicate_has_superuser_bypass_and_tenant_match() {
    assert_eq!(
        companies().predicate_sql(),
        "current_setting('is_superuser', true) = 'on' OR tenant_id = current_setting('app.current_tenant', true)"
    );
}

#[test]
fn select_and_delete_use_using_only() {
    let set = companies();
    for kind in [StatementKind::Select, StatementKind::Delete] {
        let sql = set.create_statement(kind);
        assert!(sql.contains("USING ("));
        assert!(!sql.contains("WITH CHECK"));
    }
    assert!(set
        .create_statement(StatementKind::Select)
        .starts_with("CREATE POLICY companies_select_policy ON companies\n    FOR SELECT"));
}

#[test]
fn insert_uses_with_check_only_and_update_uses_both() {
    let set = companies();
    let insert = set.create_statement(StatementKind::Insert);
    assert!(insert.contains("WITH CHECK ("));
    assert!(!insert.contains("USING"));

    let update = set.create_statement(StatementKind::Update);
    assert!(update.contains("USING ("));
    assert!(update.contains("WITH CHECK ("));
    assert!(update.ends_with(");"));
}

#[test]
fn create_statements_enable_first() {
    let stmts = companies().create_statements();
    assert_eq!(stmts.len(), 5);
    assert_eq!(stmts[0], "ALTER TABLE companies ENABLE ROW LEVEL SECURITY;");
    assert_eq!(
        companies().drop_statements()[3],
        "DROP POLICY IF EXISTS companies_delete_policy ON companies;"
    );
}

#[test]
fn custom_column_and_setting_are_used() {
    let set = PolicySet::for_table("invoices", "org_id", "acme.org").unwrap();
    let sql = set.create_statement(StatementKind::Insert);
    assert!(sql.contains("org_id = current_setting('acme.org', true)"));
    assert!(sql.contains("CREATE POLICY invoices_insert_policy ON invoices"));
}

#[test]
fn rejects_unsafe_identifiers() {
    assert!(PolicySet::for_table("companies; DROP TABLE x", "tenant_id", "app.current_tenant").is_err());
    assert!(PolicySet::for_table("companies", "tenant id", "app.current_tenant").is_err());
    assert!(PolicySet::for_table("companies", "tenant_id", "current_tenant").is_err());
    assert!(PolicySet::for_table("companies", "tenant_id", "app.'x").is_err());
}

#[test]
fn script_contains_every_table() {
    let sets = vec![
        companies(),
        PolicySet::for_table("projects", "tenant_id", "app.current_tenant").unwrap(),
    ];
    let script = render_script(&sets);
    assert!(script.contains("-- table: companies"));
    assert!(script.contains("-- table: projects"));
    assert_eq!(script.matches("CREATE POLICY").count(), 8);
    assert!(script.contains("--   ALTER TABLE projects DISABLE ROW LEVEL SECURITY;"));
}

#[test]
fn session_statements_quote_tenant() {
    let s = SessionStatements::new("app.current_tenant").unwrap();
    let t = TenantId::parse("o'brien").unwrap();
    assert_eq!(s.set_local(&t), "SET LOCAL app.current_tenant = 'o''brien';");
    assert_eq!(s.reset(), "RESET app.current_tenant;");
}
