use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

/// Tenant-local role. ADMIN implies every MEMBER capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    /// Requested invitation roles fall back to MEMBER unless exactly `ADMIN`.
    pub fn from_requested(requested: Option<&str>) -> Self {
        match requested {
            Some("ADMIN") => Role::Admin,
            _ => Role::Member,
        }
    }

    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Member => true,
            Role::Admin => self == Role::Admin,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEMBER" => Ok(Role::Member),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// Authenticated identity rebuilt from a verified session on every request.
/// Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
}

impl From<&User> for Principal {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.id,
            tenant_id: u.tenant_id,
            role: u.role,
        }
    }
}

/// Claims embedded in the session token (`exp` = `iat` + 1h).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Session claims as decoded from the wire; any field may be missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSessionClaims {
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub role: Option<Role>,
}

impl RawSessionClaims {
    pub fn into_principal(self) -> Option<Principal> {
        Some(Principal {
            user_id: self.user_id?,
            tenant_id: self.tenant_id?,
            role: self.role?,
        })
    }
}

pub const INVITATION_TYPE: &str = "invitation";

/// Claims embedded in an invitation token (`exp` = `invitedAt` + 7d).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvitationClaims {
    #[serde(rename = "type")]
    pub kind: String,
    /// Trimmed and lower-cased before signing.
    pub email: String,
    pub role: Role,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    /// Inviter's email as stored at invite time.
    pub invited_by: String,
    pub invited_at: DateTime<Utc>,
    pub exp: i64,
}

/// What an invitee may see before accepting.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvitationPreview {
    pub email: String,
    pub role: Role,
    pub tenant_name: String,
    pub tenant_id: Uuid,
    pub invited_by: String,
}

impl From<InvitationClaims> for InvitationPreview {
    fn from(c: InvitationClaims) -> Self {
        Self {
            email: c.email,
            role: c.role,
            tenant_name: c.tenant_name,
            tenant_id: c.tenant_id,
            invited_by: c.invited_by,
        }
    }
}
