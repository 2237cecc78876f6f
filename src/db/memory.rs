use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{CredentialStore, DocumentStore, StoreError, StoreResult};
use crate::models::{
    note::Note,
    tenant::{PlanType, Tenant},
    user::{NewUser, User},
};

#[derive(Default)]
struct Tables {
    tenants: HashMap<Uuid, Tenant>,
    /// Keyed by normalized email, which makes the uniqueness check and the
    /// insert one step under the lock.
    users: HashMap<String, User>,
    notes: HashMap<Uuid, Note>,
}

/// In-process store for tests and local runs. Not persistent.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    credential_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(&self, slug: &str, name: &str, plan: PlanType) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            plan,
            created_at: Utc::now(),
        };
        self.tables.lock().tenants.insert(tenant.id, tenant.clone());
        tenant
    }

    pub fn rename_tenant(&self, tenant_id: Uuid, name: &str) {
        if let Some(t) = self.tables.lock().tenants.get_mut(&tenant_id) {
            t.name = name.to_string();
        }
    }

    /// Deletes the tenant with its users and notes.
    pub fn remove_tenant(&self, tenant_id: Uuid) {
        let mut tables = self.tables.lock();
        tables.tenants.remove(&tenant_id);
        tables.users.retain(|_, u| u.tenant_id != tenant_id);
        tables.notes.retain(|_, n| n.tenant_id != tenant_id);
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().users.len()
    }

    /// Number of `CredentialStore` calls served so far.
    pub fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.touch();
        Ok(self.tables.lock().users.get(email).cloned())
    }

    async fn find_user_in_tenant(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<Option<User>> {
        self.touch();
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .find(|u| u.id == user_id && u.tenant_id == tenant_id)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.touch();
        let mut tables = self.tables.lock();
        if !tables.tenants.contains_key(&user.tenant_id) {
            return Err(StoreError::MissingTenant);
        }
        if tables.users.contains_key(&user.email) {
            return Err(StoreError::Conflict);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            tenant_id: user.tenant_id,
            created_at: Utc::now(),
        };
        tables.users.insert(created.email.clone(), created.clone());
        Ok(created)
    }

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> StoreResult<Option<Tenant>> {
        self.touch();
        Ok(self.tables.lock().tenants.get(&tenant_id).cloned())
    }

    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        self.touch();
        Ok(self
            .tables
            .lock()
            .tenants
            .values()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn update_tenant_plan(&self, tenant_id: Uuid, plan: PlanType) -> StoreResult<Option<Tenant>> {
        self.touch();
        let mut tables = self.tables.lock();
        Ok(tables.tenants.get_mut(&tenant_id).map(|t| {
            t.plan = plan;
            t.clone()
        }))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_notes(&self, tenant_id: Uuid) -> StoreResult<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .tables
            .lock()
            .notes
            .values()
            .filter(|n| n.tenant_id == tenant_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn get_note(&self, tenant_id: Uuid, note_id: Uuid) -> StoreResult<Option<Note>> {
        Ok(self
            .tables
            .lock()
            .notes
            .get(&note_id)
            .filter(|n| n.tenant_id == tenant_id)
            .cloned())
    }

    async fn insert_note(&self, note: Note, limit: Option<i64>) -> StoreResult<Option<Note>> {
        let mut tables = self.tables.lock();
        if !tables.tenants.contains_key(&note.tenant_id) {
            return Err(StoreError::MissingTenant);
        }
        if let Some(limit) = limit {
            let held = tables
                .notes
                .values()
                .filter(|n| n.tenant_id == note.tenant_id)
                .count() as i64;
            if held >= limit {
                return Ok(None);
            }
        }
        tables.notes.insert(note.id, note.clone());
        Ok(Some(note))
    }

    async fn update_note(
        &self,
        tenant_id: Uuid,
        note_id: Uuid,
        title: Option<String>,
        content: Option<String>,
    ) -> StoreResult<Option<Note>> {
        let mut tables = self.tables.lock();
        let Some(note) = tables
            .notes
            .get_mut(&note_id)
            .filter(|n| n.tenant_id == tenant_id)
        else {
            return Ok(None);
        };
        if let Some(title) = title {
            note.title = title;
        }
        if let Some(content) = content {
            note.content = content;
        }
        note.updated_at = Utc::now();
        Ok(Some(note.clone()))
    }

    async fn delete_note(&self, tenant_id: Uuid, note_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock();
        let owned = tables
            .notes
            .get(&note_id)
            .is_some_and(|n| n.tenant_id == tenant_id);
        if owned {
            tables.notes.remove(&note_id);
        }
        Ok(owned)
    }
}
