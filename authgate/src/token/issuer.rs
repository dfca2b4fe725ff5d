//! Token issuance.
//!
//! Only code holding a [`SigningKey`] can mint tokens. Issuance is rare and
//! happens on the issuing authority only, so nothing here is on a hot path.
//!
//! # Post-conditions
//! - Issuing the same scope with the same key yields the same token.
//! - The issuer never stores or transmits the tokens it mints.

use std::path::{Path, PathBuf};

use jsonwebtoken::{Algorithm, Header, encode};

use super::Token;
use crate::keys::{self, KeyError, SigningKey};
use crate::scope::Scope;

/// Sign a token carrying `scope`.
///
/// # Errors
/// Returns `KeyError::InvalidKey` if the signing key cannot sign EdDSA tokens.
pub fn issue(key: &SigningKey, scope: &Scope) -> Result<Token, KeyError> {
    let header = Header::new(Algorithm::EdDSA);
    let claims = scope.to_claims();
    let jwt = encode(&header, &claims, key.encoding_key())
        .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
    tracing::debug!(scope = %scope, "issued token");
    Ok(Token(jwt))
}

/// A token minted for one entry of an issuance plan.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The component (or operator-chosen purpose) the token is meant for.
    pub component: String,
    pub scope: Scope,
    pub token: Token,
}

/// Mint one token per `(component, scope)` pair.
///
/// # Errors
/// Stops at the first pair that cannot be signed.
pub fn issue_all(
    key: &SigningKey,
    plan: &[(String, Scope)],
) -> Result<Vec<IssuedToken>, KeyError> {
    plan.iter()
        .map(|(component, scope)| {
            Ok(IssuedToken {
                component: component.clone(),
                scope: scope.clone(),
                token: issue(key, scope)?,
            })
        })
        .collect()
}

/// The issuing authority's own full-access credential.
///
/// Whether this token is derived from the private key on every use or minted
/// once and cached is left to the caller; both behave the same from the
/// outside.
#[derive(Debug, Clone)]
pub enum AuthorityToken {
    /// Sign a fresh `FullAccess` token on every call.
    Derived(SigningKey),
    /// Hand out a token minted earlier.
    Cached(Token),
}

impl AuthorityToken {
    /// Mint once now and cache the result.
    pub fn cached_from(key: &SigningKey) -> Result<Self, KeyError> {
        issue(key, &Scope::FullAccess).map(Self::Cached)
    }

    /// The current authority token.
    pub fn token(&self) -> Result<Token, KeyError> {
        match self {
            Self::Derived(key) => issue(key, &Scope::FullAccess),
            Self::Cached(token) => Ok(token.clone()),
        }
    }
}

/// What a one-time installation init produced.
#[derive(Debug)]
pub struct InitOutcome {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    /// The initial full-access token for the issuing authority.
    pub token: Token,
}

/// Create the key pair for a new installation and the first authority token.
///
/// # Pre-conditions
/// - `dir` exists and holds no key files yet.
///
/// # Errors
/// Returns `KeyError` if key generation fails or a key file cannot be
/// created. Existing key files are never overwritten.
pub fn init_installation(dir: &Path) -> Result<InitOutcome, KeyError> {
    let material = keys::generate()?;
    let (private_key_path, public_key_path) = material.write_to_dir(dir)?;
    let token = issue(&material.private_key, &Scope::FullAccess)?;

    tracing::info!(
        "initialized installation keys: private={}, public={}",
        private_key_path.display(),
        public_key_path.display()
    );

    Ok(InitOutcome {
        private_key_path,
        public_key_path,
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TenantId;
    use crate::keys::{VerificationKey, generate};
    use crate::token::validate;

    #[test]
    fn test_issue_is_deterministic() {
        let material = generate().expect("key generation");
        let scope = Scope::TenantData(TenantId::generate());

        let first = issue(&material.private_key, &scope).expect("issue");
        let second = issue(&material.private_key, &scope).expect("issue");
        assert_eq!(first, second);
    }

    #[test]
    fn test_token_has_three_segments() {
        let material = generate().expect("key generation");
        let token = issue(&material.private_key, &Scope::AdminApi).expect("issue");
        assert_eq!(token.expose().split('.').count(), 3);
    }

    #[test]
    fn test_issue_all_follows_plan() {
        let material = generate().expect("key generation");
        let tenant = TenantId::generate();
        let plan = vec![
            ("pageserver".to_string(), Scope::SafekeeperData),
            ("compute".to_string(), Scope::Tenant(tenant)),
            ("cli".to_string(), Scope::FullAccess),
        ];

        let issued = issue_all(&material.private_key, &plan).expect("issue all");
        assert_eq!(issued.len(), 3);
        for (entry, (component, scope)) in issued.iter().zip(&plan) {
            assert_eq!(&entry.component, component);
            assert_eq!(&entry.scope, scope);
            assert_eq!(
                validate(&material.public_key, entry.token.expose()).as_ref(),
                Ok(scope)
            );
        }
    }

    #[test]
    fn test_authority_token_paths_agree() {
        let material = generate().expect("key generation");
        let derived = AuthorityToken::Derived(material.private_key.clone());
        let cached = AuthorityToken::cached_from(&material.private_key).expect("cache");

        let a = derived.token().expect("derived token");
        let b = cached.token().expect("cached token");
        assert_eq!(a, b);
        assert_eq!(validate(&material.public_key, a.expose()), Ok(Scope::FullAccess));
    }

    #[test]
    fn test_init_installation_writes_keys_and_token() {
        let dir = tempfile::tempdir().expect("temp dir");
        let outcome = init_installation(dir.path()).expect("init");

        assert!(outcome.private_key_path.is_file());
        assert!(outcome.public_key_path.is_file());

        let public_key = VerificationKey::from_pem_file(&outcome.public_key_path).expect("load");
        assert_eq!(
            validate(&public_key, outcome.token.expose()),
            Ok(Scope::FullAccess)
        );
    }

    #[test]
    fn test_init_installation_twice_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        init_installation(dir.path()).expect("first init");
        assert!(matches!(
            init_installation(dir.path()),
            Err(KeyError::Io { .. })
        ));
    }
}
