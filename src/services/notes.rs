use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::{CredentialStore, DocumentStore},
    error::AuthError,
    middleware::auth::{require_role, require_same_tenant},
    models::{
        auth::{Principal, Role},
        note::Note,
        tenant::{PlanType, Tenant},
    },
};

/// Tenant-scoped note operations. Every lookup is keyed by
/// `principal.tenant_id`; another tenant's note reads as not found.
pub struct NoteService {
    documents: Arc<dyn DocumentStore>,
    store: Arc<dyn CredentialStore>,
}

impl NoteService {
    pub fn new(documents: Arc<dyn DocumentStore>, store: Arc<dyn CredentialStore>) -> Self {
        Self { documents, store }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Note>, AuthError> {
        Ok(self.documents.list_notes(principal.tenant_id).await?)
    }

    pub async fn get(&self, principal: &Principal, note_id: Uuid) -> Result<Note, AuthError> {
        self.documents
            .get_note(principal.tenant_id, note_id)
            .await?
            .ok_or(AuthError::NotFound("Note not found"))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Note, AuthError> {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Validation("Title is required"))?;

        let tenant = self
            .store
            .find_tenant_by_id(principal.tenant_id)
            .await?
            .ok_or(AuthError::NotFound("Tenant not found"))?;

        let now = Utc::now();
        self.documents
            .insert_note(
                Note {
                    id: Uuid::new_v4(),
                    title,
                    content: content.unwrap_or_default(),
                    user_id: principal.user_id,
                    tenant_id: tenant.id,
                    created_at: now,
                    updated_at: now,
                },
                tenant.plan.note_limit(),
            )
            .await?
            .ok_or(AuthError::Forbidden("Free plan limit reached"))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        note_id: Uuid,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Note, AuthError> {
        self.documents
            .update_note(principal.tenant_id, note_id, title, content)
            .await?
            .ok_or(AuthError::NotFound("Note not found"))
    }

    pub async fn delete(&self, principal: &Principal, note_id: Uuid) -> Result<(), AuthError> {
        if !self.documents.delete_note(principal.tenant_id, note_id).await? {
            return Err(AuthError::NotFound("Note not found"));
        }
        Ok(())
    }

    /// Moves the admin's own tenant to PRO.
    pub async fn upgrade_tenant(&self, principal: &Principal, slug: &str) -> Result<Tenant, AuthError> {
        require_role(principal, Role::Admin)?;

        let tenant = self
            .store
            .find_tenant_by_slug(slug)
            .await?
            .ok_or(AuthError::NotFound("Tenant not found"))?;
        require_same_tenant(principal, tenant.id)?;

        let tenant = self
            .store
            .update_tenant_plan(tenant.id, PlanType::Pro)
            .await?
            .ok_or(AuthError::NotFound("Tenant not found"))?;
        info!(tenant_id = %tenant.id, upgraded_by = %principal.user_id, "tenant upgraded to PRO");
        Ok(tenant)
    }
}
