//! Company model and tenant-bound sessions.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rowguard_core::{Result, RowGuardError, TenantId};
use rowguard_store::config::{self, RlsSection};
use rowguard_store::model::{Companies, Company, CompanyStatus, NewCompany, TenantAware};
use rowguard_store::{Filter, SessionManager, Store};

fn t(s: &str) -> TenantId {
    TenantId::parse(s).unwrap()
}

fn store_with(cfg: &str) -> Store {
    let store = Store::new(config::load_from_str(cfg).unwrap()).unwrap();
    store.define_table(Company::table_def(store.rls())).unwrap();
    store
}

fn store() -> Store {
    store_with("version: 1\n")
}

async fn onboard(sessions: &SessionManager, tenant: &str, name: &str) -> Company {
    let rls = sessions.store().rls().clone();
    let tenant_id = t(tenant);
    let name = name.to_string();
    sessions
        .run(Some(t(tenant)), move |uow| {
            Box::pin(async move { Companies::new(uow, &rls).create(&tenant_id, NewCompany::new(name)) })
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn session_without_tenant_is_refused() {
    let sessions = SessionManager::new(store(), "app");
    let err = sessions.session(None).await.err().expect("missing tenant");
    assert_eq!(err.code().as_str(), "MISSING_TENANT");
    assert_eq!(sessions.store().available_slots(), 30);
}

#[tokio::test]
async fn each_tenant_sees_only_its_company() {
    let sessions = SessionManager::new(store(), "app");
    let acme = onboard(&sessions, "acme", "Acme").await;
    onboard(&sessions, "globex", "Globex").await;

    assert_eq!(acme.tenant_id, t("acme"));
    assert_eq!(acme.status, CompanyStatus::Active);
    assert_eq!(acme.created_at, acme.updated_at);

    let mut uow = sessions.session(Some(t("acme"))).await.unwrap();
    let rls = sessions.store().rls().clone();
    let companies = Companies::new(&mut uow, &rls);
    let active = companies.find_active().unwrap().unwrap();
    assert_eq!(active.name, "Acme");
    assert_eq!(companies.list().unwrap().len(), 1);
    assert!(companies.get(&t("globex")).unwrap().is_none());
}

#[tokio::test]
async fn creating_for_another_tenant_is_rejected() {
    let sessions = SessionManager::new(store(), "app");
    let rls = sessions.store().rls().clone();

    let err = sessions
        .run(Some(t("acme")), move |uow| {
            Box::pin(async move {
                Companies::new(uow, &rls).create(&t("globex"), NewCompany::new("Globex"))
            })
        })
        .await
        .unwrap_err();
    assert!(err.is_policy_violation());

    let admin = sessions.store().begin("admin").await.unwrap();
    assert!(admin.select(Company::TABLE, &Filter::All).unwrap().is_empty());
}

#[tokio::test]
async fn run_rolls_back_when_the_closure_fails() {
    let sessions = SessionManager::new(store(), "app");
    let rls = sessions.store().rls().clone();

    let res: Result<()> = sessions
        .run(Some(t("acme")), move |uow| {
            Box::pin(async move {
                let mut companies = Companies::new(uow, &rls);
                companies.create(&t("acme"), NewCompany::new("Acme"))?;
                Err::<(), _>(RowGuardError::BadRequest("abort".into()))
            })
        })
        .await;
    assert_eq!(res.unwrap_err().code().as_str(), "BAD_REQUEST");

    let admin = sessions.store().begin("admin").await.unwrap();
    assert!(admin.select(Company::TABLE, &Filter::All).unwrap().is_empty());
    assert_eq!(sessions.store().metrics().commits.get(&[("outcome", "rolled_back")]), 1);
}

#[tokio::test]
async fn one_company_per_tenant() {
    let sessions = SessionManager::new(store(), "app");
    onboard(&sessions, "acme", "Acme").await;

    let rls = sessions.store().rls().clone();
    let err = sessions
        .run(Some(t("acme")), move |uow| {
            Box::pin(async move { Companies::new(uow, &rls).create(&t("acme"), NewCompany::new("Again")) })
        })
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "CONFLICT");
}

#[test]
fn blank_company_name_is_bad_request() {
    assert_eq!(NewCompany::new("  ").validate().unwrap_err().code().as_str(), "BAD_REQUEST");
    assert!(NewCompany::new("x".repeat(256)).validate().is_err());
    assert!(NewCompany::new("x".repeat(255)).validate().is_ok());
}

#[tokio::test]
async fn status_changes_and_removal_stay_in_scope() {
    let sessions = SessionManager::new(store(), "app");
    onboard(&sessions, "acme", "Acme").await;
    onboard(&sessions, "globex", "Globex").await;
    let rls = sessions.store().rls().clone();

    let mut uow = sessions.session(Some(t("acme"))).await.unwrap();
    {
        let mut companies = Companies::new(&mut uow, &rls);
        assert_eq!(companies.set_status(&t("acme"), CompanyStatus::Suspended).unwrap(), 1);
        assert_eq!(companies.set_status(&t("globex"), CompanyStatus::Suspended).unwrap(), 0);
        assert!(companies.find_active().unwrap().is_none());
        assert_eq!(companies.remove(&t("globex")).unwrap(), 0);
    }
    uow.commit().unwrap();

    let mut admin = sessions.store().begin("admin").await.unwrap();
    let companies = Companies::new(&mut admin, &rls);
    let all = companies.list().unwrap();
    assert_eq!(all.len(), 2);
    let acme = companies.get(&t("acme")).unwrap().unwrap();
    assert_eq!(acme.status, CompanyStatus::Suspended);
    assert!(acme.updated_at >= acme.created_at);
    assert_eq!(companies.find_active().unwrap().unwrap().name, "Globex");
}

#[tokio::test]
async fn privileged_view_with_many_active_companies_is_ambiguous() {
    let sessions = SessionManager::new(store(), "app");
    onboard(&sessions, "acme", "Acme").await;
    onboard(&sessions, "globex", "Globex").await;

    let mut admin = sessions.store().begin("admin").await.unwrap();
    let rls = sessions.store().rls().clone();
    let err = Companies::new(&mut admin, &rls).find_active().unwrap_err();
    assert_eq!(err.code().as_str(), "CONFLICT");
}

#[tokio::test]
async fn custom_tenant_column_maps_back_to_tenant_id() {
    let store = store_with("version: 1\nrls:\n  tenant_column: org_id\n  setting_name: app.current_org\n");
    let def = Company::table_def(store.rls());
    assert!(def.has_column("org_id"));
    assert!(!def.has_column("tenant_id"));

    let sessions = SessionManager::new(store, "app");
    let company = onboard(&sessions, "acme", "Acme").await;
    assert_eq!(company.tenant_id, t("acme"));

    let sql = sessions.store().policy_set(Company::TABLE).unwrap().render();
    assert!(sql.contains("org_id = current_setting('app.current_org', true)"));
}

#[test]
fn default_rls_section_matches_stock_names() {
    let rls = RlsSection::default();
    assert_eq!(rls.tenant_column, "tenant_id");
    assert_eq!(rls.setting_name, "app.current_tenant");
}
