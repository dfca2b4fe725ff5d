//! Scope registry.
//!
//! Enumerates the scope kinds a token may carry and decides, for each one,
//! which resources it authorizes.
//!
//! A scope is reduced to two orthogonal capability grants, one for data
//! access and one for the management API. Authorization only ever looks at
//! those grants, so data and management access can be separated per scope
//! without touching the token wire format.
//!
//! # Invariants
//! - `authorize` is pure and total over every `Scope`.
//! - `Scope::Unrecognized` authorizes nothing.
//! - Timeline IDs never influence a decision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::{TenantId, TenantTimelineId};

/// The scope kinds this build understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Unrestricted. Held by the issuing authority and its CLI.
    FullAccess,
    /// Legacy combined scope: data and management API for one tenant.
    Tenant,
    /// Timeline data of one tenant.
    TenantData,
    /// Management API of one tenant.
    TenantApi,
    /// Timeline data of every tenant, for the page server reading from safekeepers.
    SafekeeperData,
    /// Component-wide management API.
    AdminApi,
}

impl ScopeKind {
    /// Every legal scope kind.
    pub const ALL: [Self; 6] = [
        Self::FullAccess,
        Self::Tenant,
        Self::TenantData,
        Self::TenantApi,
        Self::SafekeeperData,
        Self::AdminApi,
    ];

    /// The value of the `scope` claim for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullAccess => "full_access",
            Self::Tenant => "tenant",
            Self::TenantData => "tenant_data",
            Self::TenantApi => "tenant_api",
            Self::SafekeeperData => "safekeeper_data",
            Self::AdminApi => "admin_api",
        }
    }

    /// Look up a kind by its claim value.
    #[must_use]
    pub fn from_claim(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Whether tokens of this kind must name a tenant.
    #[must_use]
    pub const fn is_tenant_bound(self) -> bool {
        matches!(self, Self::Tenant | Self::TenantData | Self::TenantApi)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a token authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    FullAccess,
    Tenant(TenantId),
    TenantData(TenantId),
    TenantApi(TenantId),
    SafekeeperData,
    AdminApi,
    /// A correctly signed token whose scope kind this build does not know.
    Unrecognized(String),
}

impl Scope {
    /// The kind of this scope, or `None` if it is unrecognized.
    #[must_use]
    pub const fn kind(&self) -> Option<ScopeKind> {
        match self {
            Self::FullAccess => Some(ScopeKind::FullAccess),
            Self::Tenant(_) => Some(ScopeKind::Tenant),
            Self::TenantData(_) => Some(ScopeKind::TenantData),
            Self::TenantApi(_) => Some(ScopeKind::TenantApi),
            Self::SafekeeperData => Some(ScopeKind::SafekeeperData),
            Self::AdminApi => Some(ScopeKind::AdminApi),
            Self::Unrecognized(_) => None,
        }
    }

    /// The tenant this scope is bound to, if any.
    #[must_use]
    pub const fn tenant_id(&self) -> Option<TenantId> {
        match self {
            Self::Tenant(id) | Self::TenantData(id) | Self::TenantApi(id) => Some(*id),
            Self::FullAccess | Self::SafekeeperData | Self::AdminApi | Self::Unrecognized(_) => {
                None
            }
        }
    }

    /// The capability grants this scope carries.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        match self {
            Self::FullAccess => Capabilities {
                data: Grant::AllTenants,
                management: Grant::AllTenants,
            },
            Self::Tenant(id) => Capabilities {
                data: Grant::Tenant(*id),
                management: Grant::Tenant(*id),
            },
            Self::TenantData(id) => Capabilities {
                data: Grant::Tenant(*id),
                management: Grant::Nothing,
            },
            Self::TenantApi(id) => Capabilities {
                data: Grant::Nothing,
                management: Grant::Tenant(*id),
            },
            Self::SafekeeperData => Capabilities {
                data: Grant::AllTenants,
                management: Grant::Nothing,
            },
            Self::AdminApi => Capabilities {
                data: Grant::Nothing,
                management: Grant::AllTenants,
            },
            Self::Unrecognized(_) => Capabilities::NONE,
        }
    }

    /// The wire claims for this scope.
    #[must_use]
    pub fn to_claims(&self) -> Claims {
        let scope = match self {
            Self::Unrecognized(kind) => kind.clone(),
            other => other
                .kind()
                .map_or_else(String::new, |kind| kind.as_str().to_string()),
        };
        Claims {
            scope,
            tenant_id: self.tenant_id(),
        }
    }

    /// Rebuild a scope from wire claims.
    ///
    /// Unknown scope kinds become `Scope::Unrecognized` rather than an error,
    /// so that the caller rejects them as insufficient rather than malformed.
    ///
    /// # Errors
    /// Returns `ClaimsError` if a tenant-bound kind lacks `tenant_id`, or a
    /// kind that is not tenant-bound carries one.
    pub fn from_claims(claims: Claims) -> Result<Self, ClaimsError> {
        let Some(kind) = ScopeKind::from_claim(&claims.scope) else {
            return Ok(Self::Unrecognized(claims.scope));
        };

        match (kind, claims.tenant_id) {
            (ScopeKind::Tenant, Some(id)) => Ok(Self::Tenant(id)),
            (ScopeKind::TenantData, Some(id)) => Ok(Self::TenantData(id)),
            (ScopeKind::TenantApi, Some(id)) => Ok(Self::TenantApi(id)),
            (ScopeKind::FullAccess, None) => Ok(Self::FullAccess),
            (ScopeKind::SafekeeperData, None) => Ok(Self::SafekeeperData),
            (ScopeKind::AdminApi, None) => Ok(Self::AdminApi),
            (kind, None) => Err(ClaimsError::MissingTenantId(kind)),
            (kind, Some(_)) => Err(ClaimsError::UnexpectedTenantId(kind)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(kind) => write!(f, "unrecognized({kind})"),
            other => match (other.kind(), other.tenant_id()) {
                (Some(kind), Some(id)) => write!(f, "{kind}({id})"),
                (Some(kind), None) => write!(f, "{kind}"),
                (None, _) => f.write_str("unrecognized"),
            },
        }
    }
}

/// Claims carried in the token payload.
///
/// There is no `exp`, `nbf`, or `iat`: tokens do not expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

/// Error returned when claims do not describe a consistent scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    /// A tenant-bound scope without a `tenant_id` claim.
    MissingTenantId(ScopeKind),
    /// A `tenant_id` claim on a scope that is not tenant-bound.
    UnexpectedTenantId(ScopeKind),
}

impl fmt::Display for ClaimsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTenantId(kind) => {
                write!(f, "scope {kind} requires a tenant_id claim")
            }
            Self::UnexpectedTenantId(kind) => {
                write!(f, "scope {kind} must not carry a tenant_id claim")
            }
        }
    }
}

impl std::error::Error for ClaimsError {}

/// How far a single capability reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Nothing,
    Tenant(TenantId),
    AllTenants,
}

impl Grant {
    /// Whether this grant reaches `target`.
    ///
    /// A `None` target is component-wide and needs `AllTenants`.
    #[must_use]
    pub fn covers(self, target: Option<TenantId>) -> bool {
        match (self, target) {
            (Self::AllTenants, _) => true,
            (Self::Tenant(granted), Some(requested)) => granted == requested,
            (Self::Tenant(_), None) | (Self::Nothing, _) => false,
        }
    }
}

/// The two orthogonal capabilities a scope reduces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub data: Grant,
    pub management: Grant,
}

impl Capabilities {
    /// No access at all.
    pub const NONE: Self = Self {
        data: Grant::Nothing,
        management: Grant::Nothing,
    };

    #[must_use]
    pub const fn grant(&self, capability: Capability) -> Grant {
        match capability {
            Capability::Data => self.data,
            Capability::Management => self.management,
        }
    }
}

/// Which capability a resource requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Data,
    Management,
}

/// A resource a request wants to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// WAL or page data of one timeline.
    TenantData(TenantTimelineId),
    /// Management endpoints of one tenant.
    TenantApi(TenantId),
    /// Component-wide management endpoints.
    AdminApi,
}

impl Resource {
    #[must_use]
    pub const fn capability(&self) -> Capability {
        match self {
            Self::TenantData(_) => Capability::Data,
            Self::TenantApi(_) | Self::AdminApi => Capability::Management,
        }
    }

    #[must_use]
    pub const fn tenant_id(&self) -> Option<TenantId> {
        match self {
            Self::TenantData(ttid) => Some(ttid.tenant_id),
            Self::TenantApi(id) => Some(*id),
            Self::AdminApi => None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenantData(ttid) => write!(f, "data of {ttid}"),
            Self::TenantApi(id) => write!(f, "management api of tenant {id}"),
            Self::AdminApi => f.write_str("admin api"),
        }
    }
}

/// Decide whether `scope` authorizes access to `resource`.
#[must_use]
pub fn authorize(scope: &Scope, resource: &Resource) -> bool {
    scope
        .capabilities()
        .grant(resource.capability())
        .covers(resource.tenant_id())
}

/// The component classes that host an auth gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Pageserver,
    Safekeeper,
    Broker,
}

impl Component {
    /// Whether this component honors tokens of the given scope at all.
    ///
    /// `SafekeeperData` is only meaningful to safekeepers; anywhere else it
    /// is rejected even though its grants would match.
    #[must_use]
    pub const fn accepts(self, scope: &Scope) -> bool {
        match scope {
            Scope::SafekeeperData => matches!(self, Self::Safekeeper),
            Scope::Unrecognized(_) => false,
            Scope::FullAccess
            | Scope::Tenant(_)
            | Scope::TenantData(_)
            | Scope::TenantApi(_)
            | Scope::AdminApi => true,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pageserver => "pageserver",
            Self::Safekeeper => "safekeeper",
            Self::Broker => "broker",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pageserver" => Ok(Self::Pageserver),
            "safekeeper" => Ok(Self::Safekeeper),
            "broker" | "storage_broker" => Ok(Self::Broker),
            other => Err(format!("unknown component '{other}'")),
        }
    }
}
