//! Tokens travel through the credential channel and arrive at the gate.

use axum::http::StatusCode;

use crate::credential::{
    DEFAULT_TOKEN_VAR, EnvVars, Presentation, Transport, bind, resolve_connection_string,
};
use crate::e2e_tests::helpers::*;
use crate::error::AuthError;
use crate::gate::Access;
use crate::ids::TenantId;
use crate::scope::{Component, Resource, Scope};

#[tokio::test]
async fn test_bearer_header_reaches_router() {
    let installation = Installation::new();
    let tenant = TenantId::generate();
    let token = installation.token(&Scope::TenantApi(tenant));

    let presentation = bind(Some(token), Transport::HttpBearer)
        .present(&EnvVars::new())
        .expect("present");
    let Presentation::Header(value) = presentation else {
        panic!("expected header presentation");
    };

    let (status, _) = get(
        installation.router(Component::Pageserver),
        &format!("/v1/tenant/{tenant}"),
        Some(value.to_str().expect("ascii header")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn test_connection_string_password_reaches_gate() {
    let installation = Installation::new();
    let token = installation.token(&Scope::SafekeeperData);
    let mut env = EnvVars::new();
    env.insert(DEFAULT_TOKEN_VAR.to_string(), token.expose().to_string());

    let conn = resolve_connection_string(
        "host=safekeeper-0 port=5454 options=-ctenant_id=x password=$NEON_AUTH_TOKEN",
        &env,
    )
    .expect("resolve");
    assert!(conn.is_authenticated());
    assert!(!conn.to_string().contains(token.expose()));

    let resource = Resource::TenantData(timeline_of(TenantId::generate()));
    let gate = installation.gate(Component::Safekeeper);
    assert_eq!(
        gate.check_password(conn.password().map(str::as_bytes), &resource),
        Ok(Access::Granted(Scope::SafekeeperData))
    );
}

#[test]
fn test_unset_placeholder_connects_without_credential() {
    let installation = Installation::new();
    let conn = resolve_connection_string(
        "host=safekeeper-0 port=5454 password=$NEON_AUTH_TOKEN",
        &EnvVars::new(),
    )
    .expect("resolve");
    assert!(!conn.is_authenticated());
    assert_eq!(conn.expose(), "host=safekeeper-0 port=5454");

    // the remote side sees an unauthenticated attempt, not a crash
    let resource = Resource::TenantData(timeline_of(TenantId::generate()));
    let gate = installation.gate(Component::Safekeeper);
    assert_eq!(
        gate.check_password(conn.password().map(str::as_bytes), &resource),
        Err(AuthError::MissingCredential)
    );
}

#[test]
fn test_password_transport_round_trip() {
    let installation = Installation::new();
    let tenant = TenantId::generate();
    let token = installation.token(&Scope::Tenant(tenant));

    let Presentation::Password(password) = bind(Some(token), Transport::PostgresPassword)
        .present(&EnvVars::new())
        .expect("present")
    else {
        panic!("expected password presentation");
    };

    let gate = installation.gate(Component::Safekeeper);
    let resource = Resource::TenantData(timeline_of(tenant));
    assert_eq!(
        gate.check_password(Some(password.expose().as_bytes()), &resource),
        Ok(Access::Granted(Scope::Tenant(tenant)))
    );
}

#[test]
fn test_connection_string_transport_binds_named_var() {
    let installation = Installation::new();
    let token = installation.token(&Scope::AdminApi);
    let transport = Transport::ConnectionString {
        template: "host=pageserver port=6400 password=${PAGESERVER_TOKEN}".to_string(),
        var: "PAGESERVER_TOKEN".to_string(),
    };

    let Presentation::ConnectionString(conn) =
        bind(Some(token.clone()), transport).present(&EnvVars::new()).expect("present")
    else {
        panic!("expected connection string presentation");
    };
    assert_eq!(conn.password(), Some(token.expose()));

    let gate = installation.gate(Component::Pageserver);
    assert_eq!(
        gate.check_password(conn.password().map(str::as_bytes), &Resource::AdminApi),
        Ok(Access::Granted(Scope::AdminApi))
    );
}
