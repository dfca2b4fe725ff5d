//! ID types for tenants and timelines.
//!
//! This module provides newtype wrappers for tenant and timeline IDs,
//! ensuring type safety and providing hex parsing and display.
//!
//! # Invariants
//!
//! - Every ID is exactly 16 bytes.
//! - The textual form is always 32 lowercase hex characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of bytes in a tenant or timeline ID.
pub const ID_LEN: usize = 16;

/// Error returned when an ID string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    /// The string does not have exactly 32 characters.
    InvalidLength(usize),
    /// The string contains a character that is not a hex digit.
    InvalidCharacter(char),
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(len) => {
                write!(f, "expected {} hex characters, got {len}", ID_LEN * 2)
            }
            Self::InvalidCharacter(c) => write!(f, "invalid hex character {c:?}"),
        }
    }
}

impl std::error::Error for IdParseError {}

fn decode_hex(s: &str) -> Result<[u8; ID_LEN], IdParseError> {
    let mut bytes = [0u8; ID_LEN];
    hex::decode_to_slice(s, &mut bytes).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, .. } => IdParseError::InvalidCharacter(c),
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            IdParseError::InvalidLength(s.chars().count())
        }
    })?;
    Ok(bytes)
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; ID_LEN]);

        impl $name {
            /// Generate a random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(rand::random())
            }

            /// Get the underlying byte array.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_hex(s).map(Self)
            }
        }

        impl From<[u8; ID_LEN]> for $name {
            fn from(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_id!(
    /// A tenant identifier.
    ///
    /// Tenants are the isolation boundary that tokens must never cross.
    TenantId
);

hex_id!(
    /// A timeline identifier.
    ///
    /// Timelines belong to a tenant. Their IDs are random, and the auth layer
    /// never looks at them when making a decision.
    TimelineId
);

/// A timeline together with the tenant that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantTimelineId {
    pub tenant_id: TenantId,
    pub timeline_id: TimelineId,
}

impl TenantTimelineId {
    #[must_use]
    pub const fn new(tenant_id: TenantId, timeline_id: TimelineId) -> Self {
        Self {
            tenant_id,
            timeline_id,
        }
    }
}

impl fmt::Display for TenantTimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.timeline_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_display_is_lowercase_hex() {
        let id = TenantId([0xab; ID_LEN]);
        assert_eq!(id.to_string(), "abababababababababababababababab");
    }

    #[test]
    fn test_tenant_id_parse_display_agree() {
        let text = "0123456789abcdef0123456789abcdef";
        let id: TenantId = text.parse().expect("valid id");
        assert_eq!(id.to_string(), text);
        assert_eq!(id.as_bytes()[0], 0x01);
        assert_eq!(id.as_bytes()[15], 0xef);
    }

    #[test]
    fn test_parse_accepts_uppercase() {
        let id: TimelineId = "ABCDEF00000000000000000000000000".parse().expect("valid id");
        assert_eq!(id.to_string(), "abcdef00000000000000000000000000");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let result = "abc".parse::<TenantId>();
        assert_eq!(result, Err(IdParseError::InvalidLength(3)));
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let result = "zz000000000000000000000000000000".parse::<TenantId>();
        assert_eq!(result, Err(IdParseError::InvalidCharacter('z')));
    }

    #[test]
    fn test_parse_rejects_multibyte_characters() {
        // non-ASCII input never decodes
        let result = "é0000000000000000000000000000000".parse::<TenantId>();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_odd_length() {
        let result = "0123456789abcdef0123456789abcde".parse::<TimelineId>();
        assert_eq!(result, Err(IdParseError::InvalidLength(31)));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(TenantId::generate(), TenantId::generate());
    }

    #[test]
    fn test_ttid_display() {
        let ttid = TenantTimelineId::new(TenantId([1; ID_LEN]), TimelineId([2; ID_LEN]));
        assert_eq!(
            ttid.to_string(),
            "01010101010101010101010101010101/02020202020202020202020202020202"
        );
    }
}
