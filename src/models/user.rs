use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::auth::Role;
use super::tenant::Tenant;

/// DB row struct; role is fetched as TEXT and parsed in `From<UserRow>`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Globally unique across tenants.
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            role: r.role.parse().unwrap_or(Role::Member),
            tenant_id: r.tenant_id,
            created_at: r.created_at,
        }
    }
}

/// Insert payload; `email` must already be normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Uuid,
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteUserRequest {
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteTokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileTenant {
    pub name: String,
    pub slug: String,
    pub plan: super::tenant::PlanType,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub tenant: ProfileTenant,
}

impl UserProfile {
    pub fn new(user: User, tenant: Tenant) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            tenant: ProfileTenant {
                name: tenant.name,
                slug: tenant.slug,
                plan: tenant.plan,
            },
        }
    }
}

/// Normalized form used for every email comparison and insert.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

lazy_static::lazy_static! {
    static ref EMAIL_RE: regex::Regex =
        regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles");
}

/// Simple mailbox syntax check, applied to the normalized form.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
