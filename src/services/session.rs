use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::Duration;

use crate::models::auth::{Principal, RawSessionClaims};
use crate::services::token::{TokenCodec, TokenError};

pub const SESSION_COOKIE: &str = "auth";
pub const SESSION_TTL_SECONDS: i64 = 3600;

/// Stateless sessions: the signed claim lives only in the `auth` cookie,
/// so there is no server-side revocation before expiry.
pub struct SessionManager {
    codec: Arc<TokenCodec>,
    secure: bool,
}

impl SessionManager {
    pub fn new(codec: Arc<TokenCodec>, secure: bool) -> Self {
        Self { codec, secure }
    }

    /// Signs `{userId, tenantId, role}` with an absolute one-hour expiry.
    pub fn issue_session(&self, principal: &Principal) -> Result<String, TokenError> {
        self.codec
            .sign(principal, Some(Duration::seconds(SESSION_TTL_SECONDS)))
    }

    /// Principal carried by a session token, if the token verifies and names
    /// a user, a tenant and a role.
    pub fn principal_from_token(&self, token: &str) -> Option<Principal> {
        match self.codec.verify::<RawSessionClaims>(token) {
            Ok(raw) => raw.into_principal(),
            Err(e) => {
                tracing::debug!(reason = %e, "session token rejected");
                None
            }
        }
    }

    pub fn current_principal(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = get_cookie(headers, SESSION_COOKIE)?;
        self.principal_from_token(&token)
    }

    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, SESSION_TTL_SECONDS)
    }

    pub fn clear_session_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(&prefix)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}
