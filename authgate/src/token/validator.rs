//! Token validation.
//!
//! # Invariants
//! - Validation is stateless: no I/O, no locks, no caches.
//! - Only `EdDSA` tokens are accepted.
//! - Expiry is never checked, because tokens do not carry one.

use std::collections::HashSet;
use std::sync::LazyLock;

use jsonwebtoken::{Algorithm, Validation, decode};

use crate::error::AuthError;
use crate::keys::VerificationKey;
use crate::scope::{Claims, Scope};

static VALIDATION: LazyLock<Validation> = LazyLock::new(|| {
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation
});

/// Verify `token` against `key` and return the scope it carries.
///
/// # Errors
/// Returns `AuthError::InvalidToken` if the token is malformed, signed by a
/// different key, or carries inconsistent claims.
pub fn validate(key: &VerificationKey, token: &str) -> Result<Scope, AuthError> {
    let data = decode::<Claims>(token, key.decoding_key(), &VALIDATION).map_err(map_jwt_error)?;
    Scope::from_claims(data.claims).map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Maps jsonwebtoken errors to `AuthError::InvalidToken` with a short reason.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    let reason = match error.kind() {
        ErrorKind::InvalidSignature => "signature mismatch",
        ErrorKind::InvalidAlgorithm => "algorithm not allowed",
        ErrorKind::Json(_) => "malformed claims",
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => "malformed JWT",
        _ => "verification failed",
    };
    AuthError::InvalidToken(reason.to_string())
}
