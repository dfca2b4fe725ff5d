//! Key material for one installation.
//!
//! An installation owns exactly one Ed25519 key pair. The issuing authority
//! holds the [`SigningKey`]; every runtime component holds only the
//! [`VerificationKey`].
//!
//! # Pre-conditions
//! - PEM inputs must contain an Ed25519 key (PKCS#8 for private keys, SPKI
//!   for public keys).
//!
//! # Post-conditions
//! - Key values are immutable once constructed.
//!
//! # Invariants
//! - A `VerificationKey` can never be turned into something that signs.
//! - Key bytes never appear in `Debug` output.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey, KeypairBytes};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::TryRngCore;
use rand::rngs::OsRng;

/// File name of the private key inside an installation directory.
pub const PRIVATE_KEY_FILE: &str = "auth_private_key.pem";
/// File name of the public key inside an installation directory.
pub const PUBLIC_KEY_FILE: &str = "auth_public_key.pem";

/// Errors raised while creating, loading, or persisting keys.
#[derive(Debug)]
pub enum KeyError {
    /// The operating system could not provide entropy for a new key.
    KeyGenerationFailure(String),
    /// The key could not be encoded or parsed.
    InvalidKey(String),
    /// Reading or writing a key file failed.
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyGenerationFailure(reason) => write!(f, "key generation failed: {reason}"),
            Self::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
            Self::Io { path, source } => write!(f, "key file {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for KeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::KeyGenerationFailure(_) | Self::InvalidKey(_) => None,
        }
    }
}

/// The private half of an installation key pair.
///
/// Only the issuing authority ever constructs one of these.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    pem: String,
}

impl SigningKey {
    /// Parse a PKCS#8 PEM-encoded Ed25519 private key.
    ///
    /// # Errors
    /// Returns `KeyError::InvalidKey` if the PEM is not an Ed25519 private key.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let encoding = EncodingKey::from_ed_pem(pem.as_bytes())
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self {
            encoding,
            pem: pem.to_string(),
        })
    }

    /// Load a private key from a PEM file.
    pub fn from_pem_file(path: &Path) -> Result<Self, KeyError> {
        let pem = read_key_file(path)?;
        Self::from_pem(&pem)
    }

    pub(crate) const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// The PEM text of this key.
    #[must_use]
    pub fn to_pem(&self) -> &str {
        &self.pem
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// The public half of an installation key pair.
///
/// This is all a runtime component needs to validate tokens.
#[derive(Clone)]
pub struct VerificationKey {
    decoding: DecodingKey,
    pem: String,
}

impl VerificationKey {
    /// Parse an SPKI PEM-encoded Ed25519 public key.
    ///
    /// # Errors
    /// Returns `KeyError::InvalidKey` if the PEM is not an Ed25519 public key.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let decoding = DecodingKey::from_ed_pem(pem.as_bytes())
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self {
            decoding,
            pem: pem.to_string(),
        })
    }

    /// Load a public key from a PEM file.
    pub fn from_pem_file(path: &Path) -> Result<Self, KeyError> {
        let pem = read_key_file(path)?;
        Self::from_pem(&pem)
    }

    pub(crate) const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    #[must_use]
    pub fn to_pem(&self) -> &str {
        &self.pem
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationKey(..)")
    }
}

/// A complete key pair, as created once per installation.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub private_key: SigningKey,
    pub public_key: VerificationKey,
}

impl KeyMaterial {
    /// Split into the private and public halves.
    ///
    /// Hand the public half to runtime components; keep the private half with
    /// the issuing authority.
    #[must_use]
    pub fn into_parts(self) -> (SigningKey, VerificationKey) {
        (self.private_key, self.public_key)
    }

    /// Write both keys into `dir` as [`PRIVATE_KEY_FILE`] and [`PUBLIC_KEY_FILE`].
    ///
    /// # Pre-conditions
    /// - `dir` exists and neither key file exists yet.
    ///
    /// # Post-conditions
    /// - On Unix the private key file is readable only by its owner.
    ///
    /// # Errors
    /// Returns `KeyError::Io` if a file already exists or cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf), KeyError> {
        let private_path = dir.join(PRIVATE_KEY_FILE);
        let public_path = dir.join(PUBLIC_KEY_FILE);

        write_new_file(&private_path, self.private_key.to_pem(), 0o600)?;
        write_new_file(&public_path, self.public_key.to_pem(), 0o644)?;

        Ok((private_path, public_path))
    }
}

/// Generate a fresh key pair for a new installation.
///
/// # Errors
/// Returns `KeyError::KeyGenerationFailure` if the OS random source fails.
pub fn generate() -> Result<KeyMaterial, KeyError> {
    let mut seed = [0u8; ed25519_dalek::SECRET_KEY_LENGTH];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|e| KeyError::KeyGenerationFailure(e.to_string()))?;
    let signing = ed25519_dalek::SigningKey::from_bytes(&seed);

    // PKCS#8 v1 (seed only) is the form every JWT backend accepts.
    let private_pem = KeypairBytes {
        secret_key: seed,
        public_key: None,
    }
    .to_pkcs8_pem(LineEnding::LF)
    .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
    let public_pem = signing
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

    let material = KeyMaterial {
        private_key: SigningKey::from_pem(&private_pem)?,
        public_key: VerificationKey::from_pem(&public_pem)?,
    };
    tracing::debug!("generated new installation key pair");
    Ok(material)
}

fn read_key_file(path: &Path) -> Result<String, KeyError> {
    fs::read_to_string(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_new_file(path: &Path, contents: &str, mode: u32) -> Result<(), KeyError> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let io_err = |source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = options.open(path).map_err(io_err)?;
    file.write_all(contents.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_pem_pair() {
        let material = generate().expect("key generation");
        assert!(material.private_key.to_pem().contains("BEGIN PRIVATE KEY"));
        assert!(material.public_key.to_pem().contains("BEGIN PUBLIC KEY"));
    }

    #[test]
    fn test_generate_is_fresh_each_time() {
        let a = generate().expect("key generation");
        let b = generate().expect("key generation");
        assert_ne!(a.public_key.to_pem(), b.public_key.to_pem());
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let material = generate().expect("key generation");
        let rendered = format!("{material:?}");
        assert!(!rendered.contains("BEGIN"));
        assert!(rendered.contains("SigningKey(..)"));
    }

    #[test]
    fn test_from_pem_rejects_garbage() {
        assert!(matches!(
            SigningKey::from_pem("not a pem"),
            Err(KeyError::InvalidKey(_))
        ));
        assert!(matches!(
            VerificationKey::from_pem("not a pem"),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let material = generate().expect("key generation");
        let (private_path, public_path) = material.write_to_dir(dir.path()).expect("write keys");

        let private_key = SigningKey::from_pem_file(&private_path).expect("load private key");
        let public_key = VerificationKey::from_pem_file(&public_path).expect("load public key");
        assert_eq!(private_key.to_pem(), material.private_key.to_pem());
        assert_eq!(public_key.to_pem(), material.public_key.to_pem());
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("temp dir");
        let material = generate().expect("key generation");
        let (private_path, _) = material.write_to_dir(dir.path()).expect("write keys");

        let mode = fs::metadata(&private_path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_write_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = generate().expect("key generation");
        let second = generate().expect("key generation");
        first.write_to_dir(dir.path()).expect("write keys");

        let result = second.write_to_dir(dir.path());
        assert!(matches!(result, Err(KeyError::Io { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = VerificationKey::from_pem_file(Path::new("/nonexistent/auth_public_key.pem"));
        assert!(matches!(result, Err(KeyError::Io { .. })));
    }

    #[test]
    fn test_key_error_display() {
        assert_eq!(
            KeyError::KeyGenerationFailure("no entropy".to_string()).to_string(),
            "key generation failed: no entropy"
        );
        assert_eq!(
            KeyError::InvalidKey("bad".to_string()).to_string(),
            "invalid key: bad"
        );
    }
}
