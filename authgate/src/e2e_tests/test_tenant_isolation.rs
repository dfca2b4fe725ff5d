//! A tenant token reaches its own tenant and nothing else.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;
use crate::error::AuthError;
use crate::gate::Access;
use crate::ids::TenantId;
use crate::scope::{Component, Resource, Scope};

#[test]
fn test_tenant_data_token_scenario() {
    let installation = Installation::new();
    let tenant1: TenantId = "11111111111111111111111111111111".parse().expect("tenant-1");
    let tenant2: TenantId = "22222222222222222222222222222222".parse().expect("tenant-2");
    let t1 = installation.token(&Scope::TenantData(tenant1));
    let gate = installation.gate(Component::Safekeeper);

    let own = Resource::TenantData(timeline_of(tenant1));
    assert_eq!(
        gate.check(Some(t1.expose()), &own),
        Ok(Access::Granted(Scope::TenantData(tenant1)))
    );

    let other = Resource::TenantData(timeline_of(tenant2));
    let err = gate.check(Some(t1.expose()), &other).expect_err("tenant-2 must be refused");
    assert_eq!(
        err,
        AuthError::UnauthorizedScope {
            scope: Scope::TenantData(tenant1),
            resource: other,
        }
    );
    assert!(!err.is_credential_failure());
}

#[tokio::test]
async fn test_tenant_isolation_over_http() {
    let installation = Installation::new();
    let tenant1 = TenantId::generate();
    let tenant2 = TenantId::generate();
    let token = installation.token(&Scope::Tenant(tenant1));

    let (status, body) = get_with_token(
        installation.router(Component::Pageserver),
        &wal_uri(timeline_of(tenant1)),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&tenant1.to_string()));

    let (status, _) = get_with_token(
        installation.router(Component::Pageserver),
        &format!("/v1/tenant/{tenant1}"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_with_token(
        installation.router(Component::Pageserver),
        &wal_uri(timeline_of(tenant2)),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.contains(token.expose()));

    let (status, _) = get_with_token(
        installation.router(Component::Pageserver),
        &format!("/v1/tenant/{tenant2}"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tenant_token_cannot_reach_admin_api() {
    let installation = Installation::new();
    let token = installation.token(&Scope::Tenant(TenantId::generate()));

    let (status, _) =
        get_with_token(installation.router(Component::Pageserver), "/v1/tenant", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_data_and_management_are_separate() {
    let installation = Installation::new();
    let tenant = TenantId::generate();
    let data_only = installation.token(&Scope::TenantData(tenant));
    let api_only = installation.token(&Scope::TenantApi(tenant));
    let wal = wal_uri(timeline_of(tenant));
    let api = format!("/v1/tenant/{tenant}");

    let router = installation.router(Component::Safekeeper);
    assert_eq!(get_with_token(router.clone(), &wal, &data_only).await.0, StatusCode::OK);
    assert_eq!(get_with_token(router.clone(), &api, &data_only).await.0, StatusCode::FORBIDDEN);
    assert_eq!(get_with_token(router.clone(), &wal, &api_only).await.0, StatusCode::FORBIDDEN);
    assert_eq!(get_with_token(router, &api, &api_only).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_safekeeper_data_only_on_safekeeper() {
    let installation = Installation::new();
    let token = installation.token(&Scope::SafekeeperData);
    let uri = wal_uri(timeline_of(TenantId::generate()));

    let (status, _) =
        get_with_token(installation.router(Component::Safekeeper), &uri, &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        get_with_token(installation.router(Component::Pageserver), &uri, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_full_access_everywhere() {
    let installation = Installation::new();
    let token = installation.token(&Scope::FullAccess);
    let tenant = TenantId::generate();

    for component in [Component::Pageserver, Component::Safekeeper, Component::Broker] {
        for uri in [
            "/v1/tenant".to_string(),
            format!("/v1/tenant/{tenant}"),
            wal_uri(timeline_of(tenant)),
        ] {
            let (status, _) = get_with_token(installation.router(component), &uri, &token).await;
            assert_eq!(status, StatusCode::OK, "{component} {uri}");
        }
    }
}
