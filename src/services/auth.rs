use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    db::CredentialStore,
    error::AuthError,
    middleware::auth::require_role,
    models::{
        auth::{Principal, Role},
        user::{is_valid_email, normalize_email, NewUser, User, UserProfile},
    },
    services::{
        metrics::LOGINS_COUNTER,
        password::{PasswordHasher, MIN_PASSWORD_LEN},
        session::SessionManager,
    },
};

/// Password login, profile projection and direct account creation.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    sessions: Arc<SessionManager>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, sessions: Arc<SessionManager>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            sessions,
            hasher,
        }
    }

    /// Verifies the credentials and returns a signed session token for the
    /// stored `(userId, tenantId, role)`. Unknown email and wrong password
    /// are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<(Principal, String), AuthError> {
        let email = normalize_email(email);

        let user = match self.store.find_user_by_email(&email).await? {
            Some(u) => u,
            None => {
                LOGINS_COUNTER.with_label_values(&["failure"]).inc();
                warn!(email = %email, "login for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash).await {
            LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let principal = Principal::from(&user);
        let token = self
            .sessions
            .issue_session(&principal)
            .map_err(|e| AuthError::Internal(e.into()))?;

        LOGINS_COUNTER.with_label_values(&["success"]).inc();
        info!(user_id = %user.id, tenant_id = %user.tenant_id, "login succeeded");
        Ok((principal, token))
    }

    pub async fn profile(&self, principal: &Principal) -> Result<UserProfile, AuthError> {
        let user = self
            .store
            .find_user_in_tenant(principal.tenant_id, principal.user_id)
            .await?
            .ok_or(AuthError::NotFound("User not found"))?;
        let tenant = self
            .store
            .find_tenant_by_id(principal.tenant_id)
            .await?
            .ok_or(AuthError::NotFound("Tenant not found"))?;
        Ok(UserProfile::new(user, tenant))
    }

    /// Admin creates an account in their own tenant without an invitation.
    pub async fn create_user_directly(
        &self,
        admin: &Principal,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<User, AuthError> {
        require_role(admin, Role::Admin)?;

        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Email and password are required"));
        }
        if !is_valid_email(&email) {
            return Err(AuthError::Validation("Invalid email format"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation("Password must be at least 8 characters"));
        }

        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                email,
                password_hash,
                role: Role::from_requested(role),
                tenant_id: admin.tenant_id,
            })
            .await?;

        info!(
            user_id = %user.id,
            tenant_id = %user.tenant_id,
            created_by = %admin.user_id,
            "user created by admin"
        );
        Ok(user)
    }
}
