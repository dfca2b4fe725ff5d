//! Per-component auth gate.
//!
//! The gate is the single enforcement point for HTTP API requests and
//! inter-component connections. Its posture is chosen once at startup and
//! never changes for the life of the process.
//!
//! # Pre-conditions
//! - An `Enforcing` gate is built from a public key that was loaded
//!   successfully. A missing or unreadable key is a startup error, never a
//!   reason to fall back to `Disabled`.
//!
//! # Post-conditions
//! - A rejected request never reaches handler logic.
//!
//! # Invariants
//! - The gate holds no mutable state; it may be shared freely across tasks.
//! - Token values are never logged.

use std::fmt;
use std::sync::Arc;

use crate::credential::parse_bearer;
use crate::error::AuthError;
use crate::keys::VerificationKey;
use crate::scope::{Component, Resource, Scope, authorize};
use crate::token::validate;

/// How a gate treats incoming requests.
#[derive(Clone)]
pub enum AuthPosture {
    /// Every request is authorized. The default, for local debugging.
    Disabled,
    /// Legacy configuration alias of `Disabled`.
    Trusting,
    /// Every request must present a token that validates and whose scope
    /// covers the requested resource.
    Enforcing(Arc<VerificationKey>),
}

impl AuthPosture {
    /// Posture for an optional public key: present enforces, absent disables.
    #[must_use]
    pub fn from_public_key(key: Option<VerificationKey>) -> Self {
        key.map_or(Self::Disabled, |key| Self::Enforcing(Arc::new(key)))
    }

    #[must_use]
    pub const fn is_enforcing(&self) -> bool {
        matches!(self, Self::Enforcing(_))
    }
}

impl fmt::Debug for AuthPosture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Trusting => f.write_str("Trusting"),
            Self::Enforcing(_) => f.write_str("Enforcing"),
        }
    }
}

impl fmt::Display for AuthPosture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// The gate does not enforce; nothing was checked.
    Unchecked,
    /// The token validated and its scope covers the resource.
    Granted(Scope),
}

/// The auth gate of one component.
#[derive(Debug, Clone)]
pub struct AuthGate {
    component: Component,
    posture: AuthPosture,
}

impl AuthGate {
    #[must_use]
    pub const fn new(component: Component, posture: AuthPosture) -> Self {
        Self { component, posture }
    }

    #[must_use]
    pub const fn component(&self) -> Component {
        self.component
    }

    #[must_use]
    pub const fn posture(&self) -> &AuthPosture {
        &self.posture
    }

    /// Check a raw token (or its absence) against `resource`.
    ///
    /// # Errors
    /// - `MissingCredential` if enforcing and `token` is `None`.
    /// - `InvalidToken` if the token does not validate.
    /// - `UnauthorizedScope` if the scope does not cover `resource`, or this
    ///   component does not honor the scope at all.
    pub fn check(&self, token: Option<&str>, resource: &Resource) -> Result<Access, AuthError> {
        let key = match &self.posture {
            AuthPosture::Disabled | AuthPosture::Trusting => return Ok(Access::Unchecked),
            AuthPosture::Enforcing(key) => key,
        };

        let token = token.ok_or(AuthError::MissingCredential)?;
        let scope = validate(key, token)?;

        if !self.component.accepts(&scope) || !authorize(&scope, resource) {
            tracing::debug!(
                component = %self.component,
                scope = %scope,
                resource = %resource,
                "scope does not authorize request"
            );
            return Err(AuthError::UnauthorizedScope {
                scope,
                resource: *resource,
            });
        }

        tracing::debug!(
            component = %self.component,
            scope = ?scope.kind(),
            tenant_id = ?scope.tenant_id(),
            "auth succeeded"
        );
        Ok(Access::Granted(scope))
    }

    /// Check the value of an HTTP `Authorization` header.
    ///
    /// A header that is present but not a bearer credential is an invalid
    /// token, not a missing one.
    pub fn check_authorization_header(
        &self,
        header: Option<&str>,
        resource: &Resource,
    ) -> Result<Access, AuthError> {
        if !self.posture.is_enforcing() {
            return Ok(Access::Unchecked);
        }
        self.check(bearer_token(header)?, resource)
    }

    /// Validate the credential of an HTTP `Authorization` header without
    /// checking it against any resource.
    ///
    /// # Errors
    /// `MissingCredential` or `InvalidToken` when enforcing.
    pub fn authenticate_authorization_header(&self, header: Option<&str>) -> Result<(), AuthError> {
        let AuthPosture::Enforcing(key) = &self.posture else {
            return Ok(());
        };
        let token = bearer_token(header)?.ok_or(AuthError::MissingCredential)?;
        validate(key, token).map(drop)
    }

    /// Check the password field of a PostgreSQL-style auth exchange.
    pub fn check_password(
        &self,
        password: Option<&[u8]>,
        resource: &Resource,
    ) -> Result<Access, AuthError> {
        if !self.posture.is_enforcing() {
            return Ok(Access::Unchecked);
        }
        let token = password
            .map(|bytes| {
                std::str::from_utf8(bytes)
                    .map(|s| s.trim_end_matches('\0'))
                    .map_err(|_| AuthError::InvalidToken("password is not UTF-8".into()))
            })
            .transpose()?;
        self.check(token, resource)
    }
}

fn bearer_token(header: Option<&str>) -> Result<Option<&str>, AuthError> {
    header
        .map(|value| {
            parse_bearer(value).ok_or_else(|| {
                AuthError::InvalidToken("authorization header is not a bearer credential".into())
            })
        })
        .transpose()
}
