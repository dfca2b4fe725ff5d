//! Authentication and authorization errors.
//!
//! Every variant is local to a single request or connection. None of them
//! should ever take the serving component down.

use std::fmt;

use crate::scope::{Resource, Scope};

/// Errors returned by token validation and by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is malformed or its signature does not verify.
    InvalidToken(String),
    /// The token is valid but its scope does not cover the resource.
    UnauthorizedScope {
        /// The scope the token carried.
        scope: Scope,
        /// The resource that was requested.
        resource: Resource,
    },
    /// No token was presented while the gate is enforcing.
    MissingCredential,
}

impl AuthError {
    /// Whether the failure is about the credential itself ("bad credential")
    /// rather than its privileges ("wrong privilege").
    ///
    /// `MissingCredential` counts as a bad credential.
    #[must_use]
    pub const fn is_credential_failure(&self) -> bool {
        matches!(self, Self::InvalidToken(_) | Self::MissingCredential)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken(reason) => write!(f, "invalid token: {reason}"),
            Self::UnauthorizedScope { scope, resource } => {
                write!(f, "scope {scope} does not authorize {resource}")
            }
            Self::MissingCredential => write!(f, "missing credential"),
        }
    }
}

impl std::error::Error for AuthError {}
