use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::auth::{Principal, Role},
    services::session::SessionManager,
    AppState,
};

/// Every protected handler takes a `Principal` argument, which makes the
/// session check run before the handler body. Handlers then filter all state
/// by `principal.tenant_id`.
impl FromRequestParts<AppState> for Principal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_session(&state.sessions, &parts.headers)
    }
}

/// A session whose role is ADMIN. Being a parts extractor it rejects
/// non-admins before any request body is read or parsed.
#[derive(Debug, Clone, Copy)]
pub struct AdminPrincipal(pub Principal);

impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = require_session(&state.sessions, &parts.headers)?;
        require_role(&principal, Role::Admin)?;
        Ok(AdminPrincipal(principal))
    }
}

pub fn require_session(sessions: &SessionManager, headers: &HeaderMap) -> Result<Principal, AuthError> {
    sessions.current_principal(headers).ok_or_else(|| {
        tracing::debug!("request without a valid session");
        AuthError::Unauthorized
    })
}

pub fn require_role(principal: &Principal, role: Role) -> Result<(), AuthError> {
    if principal.role.satisfies(role) {
        return Ok(());
    }
    tracing::debug!(user_id = %principal.user_id, required = %role, "role check failed");
    Err(AuthError::Forbidden("Admin access required"))
}

/// Cross-tenant administration is never allowed, whatever the role.
pub fn require_same_tenant(principal: &Principal, tenant_id: Uuid) -> Result<(), AuthError> {
    if principal.tenant_id == tenant_id {
        return Ok(());
    }
    tracing::warn!(
        user_id = %principal.user_id,
        own_tenant = %principal.tenant_id,
        target_tenant = %tenant_id,
        "cross-tenant access refused"
    );
    Err(AuthError::Forbidden("Access denied"))
}
