//! Tokens from one installation are worthless in another.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;
use crate::error::AuthError;
use crate::ids::TenantId;
use crate::scope::{Component, Resource, Scope};

#[test]
fn test_foreign_token_is_invalid_not_unauthorized() {
    let ours = Installation::new();
    let theirs = Installation::new();
    let token = theirs.token(&Scope::FullAccess);

    let result = ours.gate(Component::Pageserver).check(Some(token.expose()), &Resource::AdminApi);
    assert!(matches!(result, Err(AuthError::InvalidToken(_))));
}

#[tokio::test]
async fn test_foreign_token_over_http_is_401() {
    let ours = Installation::new();
    let theirs = Installation::new();
    let tenant = TenantId::generate();
    let token = theirs.token(&Scope::Tenant(tenant));

    let (status, _) = get_with_token(
        ours.router(Component::Safekeeper),
        &wal_uri(timeline_of(tenant)),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
