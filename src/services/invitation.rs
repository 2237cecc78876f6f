use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::{
    db::CredentialStore,
    error::AuthError,
    middleware::auth::require_role,
    models::{
        auth::{InvitationClaims, InvitationPreview, Principal, Role, INVITATION_TYPE},
        user::{is_valid_email, normalize_email, NewUser, User},
    },
    services::{
        metrics::{outcome, INVITATIONS_COUNTER, INVITATION_ACCEPTS_COUNTER},
        password::{PasswordHasher, MIN_PASSWORD_LEN},
        session::SessionManager,
        token::TokenCodec,
    },
};

pub const INVITATION_TTL_DAYS: i64 = 7;

pub fn build_invite_url(base_url: &str, token: &str) -> String {
    format!(
        "{base_url}/auth/accept-invite?token={}",
        urlencoding::encode(token)
    )
}

/// Result of a successful redemption: the new account and its first session.
#[derive(Debug)]
pub struct AcceptedInvitation {
    pub user: User,
    pub principal: Principal,
    pub session_token: String,
}

/// Issues, previews and redeems invitation tokens.
///
/// Nothing records a token as consumed: a second redemption fails only
/// because the email now belongs to an account.
pub struct InvitationManager {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
    sessions: Arc<SessionManager>,
    hasher: PasswordHasher,
    base_url: String,
}

impl InvitationManager {
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn CredentialStore>,
        sessions: Arc<SessionManager>,
        hasher: PasswordHasher,
        base_url: String,
    ) -> Self {
        Self {
            codec,
            store,
            sessions,
            hasher,
            base_url,
        }
    }

    /// Returns the fully-qualified acceptance link.
    pub async fn create_invitation(
        &self,
        inviter: &Principal,
        email: &str,
        role: Option<&str>,
    ) -> Result<String, AuthError> {
        let res = self.create(inviter, email, role).await;
        INVITATIONS_COUNTER.with_label_values(&[outcome(&res).as_str()]).inc();
        res
    }

    async fn create(
        &self,
        inviter: &Principal,
        email: &str,
        role: Option<&str>,
    ) -> Result<String, AuthError> {
        require_role(inviter, Role::Admin)?;

        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required"));
        }
        if !is_valid_email(&email) {
            return Err(AuthError::Validation("Invalid email format"));
        }
        let role = Role::from_requested(role);

        // Global check: an email can never belong to two tenants.
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("User with this email already exists"));
        }

        // Tenant name and inviter email are read now, not taken from the session.
        let tenant = self
            .store
            .find_tenant_by_id(inviter.tenant_id)
            .await?
            .ok_or(AuthError::NotFound("Tenant not found"))?;
        let invited_by = self
            .store
            .find_user_in_tenant(inviter.tenant_id, inviter.user_id)
            .await?
            .ok_or(AuthError::NotFound("Inviting user not found"))?;

        let invited_at = Utc::now();
        let claims = InvitationClaims {
            kind: INVITATION_TYPE.to_string(),
            email,
            role,
            tenant_id: tenant.id,
            tenant_name: tenant.name,
            invited_by: invited_by.email,
            invited_at,
            exp: (invited_at + Duration::days(INVITATION_TTL_DAYS)).timestamp(),
        };
        let token = self
            .codec
            .sign(&claims, None)
            .map_err(|e| AuthError::Internal(e.into()))?;

        info!(
            tenant_id = %claims.tenant_id,
            invited_by = %inviter.user_id,
            email = %claims.email,
            role = %claims.role,
            "invitation created"
        );
        Ok(build_invite_url(&self.base_url, &token))
    }

    /// Signature, expiry and claim type. Every failure reads as one outcome.
    fn verify(&self, token: &str) -> Result<InvitationClaims, AuthError> {
        let claims = self
            .codec
            .verify::<InvitationClaims>(token)
            .map_err(|e| {
                warn!(reason = %e, "invitation token rejected");
                AuthError::InvalidOrExpired
            })?;
        if claims.kind != INVITATION_TYPE {
            warn!(kind = %claims.kind, "token of wrong type presented as invitation");
            return Err(AuthError::InvalidOrExpired);
        }
        Ok(claims)
    }

    pub async fn inspect_invitation(&self, token: &str) -> Result<InvitationPreview, AuthError> {
        let claims = self.verify(token)?;
        if self.store.find_user_by_email(&claims.email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }
        Ok(claims.into())
    }

    pub async fn accept_invitation(
        &self,
        token: &str,
        password: &str,
    ) -> Result<AcceptedInvitation, AuthError> {
        let res = self.accept(token, password).await;
        INVITATION_ACCEPTS_COUNTER.with_label_values(&[outcome(&res).as_str()]).inc();
        res
    }

    async fn accept(&self, token: &str, password: &str) -> Result<AcceptedInvitation, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation("Password must be at least 8 characters"));
        }

        let claims = self.verify(token)?;

        if self.store.find_tenant_by_id(claims.tenant_id).await?.is_none() {
            warn!(tenant_id = %claims.tenant_id, "invitation for a deleted tenant");
            return Err(AuthError::Gone("Tenant no longer exists"));
        }

        // Fast path only; the atomic insert below is what stops a double accept.
        if self.store.find_user_by_email(&claims.email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                email: claims.email,
                password_hash,
                role: claims.role,
                tenant_id: claims.tenant_id,
            })
            .await?;

        // The session reflects the stored record, not the invitation.
        let principal = Principal::from(&user);
        let session_token = self
            .sessions
            .issue_session(&principal)
            .map_err(|e| AuthError::Internal(e.into()))?;

        info!(user_id = %user.id, tenant_id = %user.tenant_id, "invitation accepted");
        Ok(AcceptedInvitation {
            user,
            principal,
            session_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, StoreResult};
    use crate::models::{auth::SessionClaims, tenant::{PlanType, Tenant}};
    use async_trait::async_trait;
    use uuid::Uuid;

    /// Deletes the tenant just before the user insert lands.
    struct TenantDeletedMidAccept(Arc<MemoryStore>);

    #[async_trait]
    impl CredentialStore for TenantDeletedMidAccept {
        async fn ping(&self) -> StoreResult<()> {
            self.0.ping().await
        }

        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.0.find_user_by_email(email).await
        }

        async fn find_user_in_tenant(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<Option<User>> {
            self.0.find_user_in_tenant(tenant_id, user_id).await
        }

        async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
            self.0.remove_tenant(user.tenant_id);
            self.0.insert_user(user).await
        }

        async fn find_tenant_by_id(&self, tenant_id: Uuid) -> StoreResult<Option<Tenant>> {
            self.0.find_tenant_by_id(tenant_id).await
        }

        async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
            self.0.find_tenant_by_slug(slug).await
        }

        async fn update_tenant_plan(&self, tenant_id: Uuid, plan: PlanType) -> StoreResult<Option<Tenant>> {
            self.0.update_tenant_plan(tenant_id, plan).await
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionManager>,
        invitations: InvitationManager,
        acme: Tenant,
        admin: Principal,
        member: Principal,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let codec = Arc::new(TokenCodec::new("test-secret"));
        let sessions = Arc::new(SessionManager::new(codec.clone(), false));
        let invitations = InvitationManager::new(
            codec.clone(),
            store.clone(),
            sessions.clone(),
            PasswordHasher::new(4),
            "http://localhost:3000".into(),
        );
        let acme = store.add_tenant("acme", "Acme", PlanType::Free);
        let admin = store
            .insert_user(NewUser {
                email: "admin@acme.test".into(),
                password_hash: "unused".into(),
                role: Role::Admin,
                tenant_id: acme.id,
            })
            .await
            .unwrap();
        let member = store
            .insert_user(NewUser {
                email: "user@acme.test".into(),
                password_hash: "unused".into(),
                role: Role::Member,
                tenant_id: acme.id,
            })
            .await
            .unwrap();
        Fixture {
            store,
            codec,
            sessions,
            invitations,
            acme,
            admin: Principal::from(&admin),
            member: Principal::from(&member),
        }
    }

    fn token_of(link: &str) -> String {
        let encoded = link.split("token=").nth(1).unwrap();
        urlencoding::decode(encoded).unwrap().into_owned()
    }

    #[tokio::test]
    async fn test_invite_inspect_accept() {
        let f = fixture().await;
        let link = f
            .invitations
            .create_invitation(&f.admin, "  New@User.test ", Some("MEMBER"))
            .await
            .unwrap();
        assert!(link.starts_with("http://localhost:3000/auth/accept-invite?token="));

        let token = token_of(&link);
        let preview = f.invitations.inspect_invitation(&token).await.unwrap();
        assert_eq!(preview.email, "new@user.test");
        assert_eq!(preview.role, Role::Member);
        assert_eq!(preview.tenant_name, "Acme");
        assert_eq!(preview.tenant_id, f.acme.id);
        assert_eq!(preview.invited_by, "admin@acme.test");

        let accepted = f
            .invitations
            .accept_invitation(&token, "longenough1")
            .await
            .unwrap();
        assert_eq!(accepted.user.email, "new@user.test");
        assert_eq!(accepted.principal.tenant_id, f.acme.id);
        assert_eq!(accepted.principal.role, Role::Member);
        assert_eq!(
            f.sessions.principal_from_token(&accepted.session_token),
            Some(accepted.principal)
        );

        let again = f.invitations.accept_invitation(&token, "longenough1").await;
        assert!(matches!(again, Err(AuthError::UserAlreadyExists)));
        let inspect = f.invitations.inspect_invitation(&token).await;
        assert!(matches!(inspect, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_member_is_forbidden_before_store_access() {
        let f = fixture().await;
        let calls = f.store.credential_calls();
        let res = f
            .invitations
            .create_invitation(&f.member, "new@user.test", Some("ADMIN"))
            .await;
        assert!(matches!(res, Err(AuthError::Forbidden(_))));
        assert_eq!(f.store.credential_calls(), calls);
    }

    #[tokio::test]
    async fn test_invalid_email_and_existing_user() {
        let f = fixture().await;
        let bad = f.invitations.create_invitation(&f.admin, "not-an-email", None).await;
        assert!(matches!(bad, Err(AuthError::Validation(_))));

        let taken = f
            .invitations
            .create_invitation(&f.admin, "USER@acme.test", None)
            .await;
        assert!(matches!(taken, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unknown_role_defaults_to_member() {
        let f = fixture().await;
        let link = f
            .invitations
            .create_invitation(&f.admin, "x@y.test", Some("SUPERUSER"))
            .await
            .unwrap();
        let preview = f.invitations.inspect_invitation(&token_of(&link)).await.unwrap();
        assert_eq!(preview.role, Role::Member);
    }

    #[tokio::test]
    async fn test_tenant_rename_is_read_at_invite_time() {
        let f = fixture().await;
        f.store.rename_tenant(f.acme.id, "Acme Corp");
        let link = f
            .invitations
            .create_invitation(&f.admin, "x@y.test", None)
            .await
            .unwrap();
        let preview = f.invitations.inspect_invitation(&token_of(&link)).await.unwrap();
        assert_eq!(preview.tenant_name, "Acme Corp");
    }

    #[tokio::test]
    async fn test_session_token_is_not_an_invitation() {
        let f = fixture().await;
        let session = f.sessions.issue_session(&f.admin).unwrap();
        assert!(matches!(
            f.invitations.inspect_invitation(&session).await,
            Err(AuthError::InvalidOrExpired)
        ));
        assert!(matches!(
            f.invitations.accept_invitation(&session, "longenough1").await,
            Err(AuthError::InvalidOrExpired)
        ));

        // Well-formed session claims signed with the shared secret are still refused.
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            user_id: f.admin.user_id,
            tenant_id: f.admin.tenant_id,
            role: Role::Admin,
            iat: now,
            exp: now + 3600,
        };
        let forged = f.codec.sign(&claims, None).unwrap();
        assert!(matches!(
            f.invitations.inspect_invitation(&forged).await,
            Err(AuthError::InvalidOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_wrong_claim_type_is_rejected() {
        let f = fixture().await;
        let claims = InvitationClaims {
            kind: "session".into(),
            email: "x@y.test".into(),
            role: Role::Admin,
            tenant_id: f.acme.id,
            tenant_name: "Acme".into(),
            invited_by: "admin@acme.test".into(),
            invited_at: Utc::now(),
            exp: Utc::now().timestamp() + 3600,
        };
        let token = f.codec.sign(&claims, None).unwrap();
        assert!(matches!(
            f.invitations.accept_invitation(&token, "longenough1").await,
            Err(AuthError::InvalidOrExpired)
        ));
        assert_eq!(f.store.user_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_invitation() {
        let f = fixture().await;
        let invited_at = Utc::now() - Duration::days(8);
        let claims = InvitationClaims {
            kind: INVITATION_TYPE.into(),
            email: "late@user.test".into(),
            role: Role::Member,
            tenant_id: f.acme.id,
            tenant_name: "Acme".into(),
            invited_by: "admin@acme.test".into(),
            invited_at,
            exp: (invited_at + Duration::days(INVITATION_TTL_DAYS)).timestamp(),
        };
        let token = f.codec.sign(&claims, None).unwrap();
        assert!(matches!(
            f.invitations.inspect_invitation(&token).await,
            Err(AuthError::InvalidOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_short_password_and_deleted_tenant() {
        let f = fixture().await;
        let link = f
            .invitations
            .create_invitation(&f.admin, "new@user.test", None)
            .await
            .unwrap();
        let token = token_of(&link);

        assert!(matches!(
            f.invitations.accept_invitation(&token, "short").await,
            Err(AuthError::Validation(_))
        ));

        f.store.remove_tenant(f.acme.id);
        assert!(matches!(
            f.invitations.accept_invitation(&token, "longenough1").await,
            Err(AuthError::Gone(_))
        ));
    }

    #[tokio::test]
    async fn test_tenant_deleted_between_check_and_insert() {
        let f = fixture().await;
        let link = f
            .invitations
            .create_invitation(&f.admin, "late@user.test", None)
            .await
            .unwrap();

        let racing = InvitationManager::new(
            f.codec.clone(),
            Arc::new(TenantDeletedMidAccept(f.store.clone())),
            f.sessions.clone(),
            PasswordHasher::new(4),
            "http://localhost:3000".into(),
        );
        let res = racing.accept_invitation(&token_of(&link), "longenough1").await;
        assert!(matches!(res, Err(AuthError::Gone("Tenant no longer exists"))));
        assert!(f.store.find_user_by_email("late@user.test").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_accepts_create_one_user() {
        let f = Arc::new(fixture().await);
        let link = f
            .invitations
            .create_invitation(&f.admin, "race@user.test", None)
            .await
            .unwrap();
        let token = token_of(&link);

        let (a, b) = {
            let (f1, f2) = (f.clone(), f.clone());
            let (t1, t2) = (token.clone(), token.clone());
            tokio::join!(
                tokio::spawn(async move { f1.invitations.accept_invitation(&t1, "longenough1").await }),
                tokio::spawn(async move { f2.invitations.accept_invitation(&t2, "longenough1").await }),
            )
        };
        let results = [a.unwrap(), b.unwrap()];
        let created = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AuthError::UserAlreadyExists)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(f.store.user_count(), 3);
    }
}
