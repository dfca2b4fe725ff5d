//! A gate that does not enforce lets every request through.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;
use crate::gate::{AuthGate, AuthPosture};
use crate::http::router;
use crate::ids::TenantId;
use crate::scope::{Component, Scope};

#[tokio::test]
async fn test_disabled_ignores_credentials() {
    for posture in [AuthPosture::Disabled, AuthPosture::Trusting] {
        let router = router(Arc::new(AuthGate::new(Component::Pageserver, posture)));
        let uri = wal_uri(timeline_of(TenantId::generate()));

        for authorization in [None, Some("Bearer garbage"), Some("Basic abc"), Some("")] {
            let (status, body) = get(router.clone(), &uri, authorization).await;
            assert_eq!(status, StatusCode::OK, "{authorization:?}");
            assert!(body.contains("\"scope\":null"));
        }

        let (status, _) = get(router.clone(), "/v1/tenant", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_status_reports_posture() {
    let disabled = router(Arc::new(AuthGate::new(Component::Broker, AuthPosture::Disabled)));
    let (status, body) = get(disabled, "/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"component\":\"broker\""));
    assert!(body.contains("\"auth\":\"Disabled\""));

    let installation = Installation::new();
    let (status, body) = get(installation.router(Component::Safekeeper), "/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"auth\":\"Enforcing\""));
}

#[tokio::test]
async fn test_enforcing_rejects_without_token() {
    let installation = Installation::new();
    let uri = wal_uri(timeline_of(TenantId::generate()));

    for authorization in [None, Some("Bearer garbage"), Some("Basic abc")] {
        let (status, _) = get(installation.router(Component::Pageserver), &uri, authorization).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{authorization:?}");
    }
}

#[tokio::test]
async fn test_bad_tenant_id_in_path() {
    let installation = Installation::new();
    let router = installation.router(Component::Pageserver);

    // the credential is judged before the path
    let (status, _) = get(router.clone(), "/v1/tenant/not-hex", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get(router.clone(), "/v1/tenant/not-hex/timeline/x/wal", Some("Bearer a.b.c")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = installation.token(&Scope::AdminApi);
    let (status, _) = get_with_token(router, "/v1/tenant/not-hex", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let disabled = crate::http::router(Arc::new(AuthGate::new(Component::Pageserver, AuthPosture::Disabled)));
    let (status, _) = get(disabled, "/v1/tenant/not-hex", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
