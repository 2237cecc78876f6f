use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, DocumentStore, StoreError, StoreResult};
use crate::models::{
    note::Note,
    tenant::{PlanType, Tenant, TenantRow},
    user::{NewUser, User, UserRow},
};

const USER_COLUMNS: &str = "id, email, password_hash, role, tenant_id, created_at";
const TENANT_COLUMNS: &str = "id, slug, name, plan, created_at";
const NOTE_COLUMNS: &str = "id, title, content, user_id, tenant_id, created_at, updated_at";

/// Postgres-backed store. Email uniqueness is enforced by the
/// `users_email_key` constraint, so `insert_user` needs no prior lookup.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_in_tenant(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, password_hash, role, tenant_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(user.tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Tenant::from))
    }

    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Tenant::from))
    }

    async fn update_tenant_plan(&self, tenant_id: Uuid, plan: PlanType) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "UPDATE tenants SET plan = $1 WHERE id = $2 RETURNING {TENANT_COLUMNS}"
        ))
        .bind(plan.to_string())
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Tenant::from))
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn list_notes(&self, tenant_id: Uuid) -> StoreResult<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE tenant_id = $1 ORDER BY created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    async fn get_note(&self, tenant_id: Uuid, note_id: Uuid) -> StoreResult<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(note_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn insert_note(&self, note: Note, limit: Option<i64>) -> StoreResult<Option<Note>> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the tenant serializes concurrent creates for it.
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM tenants WHERE id = $1 FOR UPDATE")
            .bind(note.tenant_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::MissingTenant);
        }

        if let Some(limit) = limit {
            let held: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM notes WHERE tenant_id = $1")
                .bind(note.tenant_id)
                .fetch_one(&mut *tx)
                .await?;
            if held >= limit {
                return Ok(None);
            }
        }

        let note = sqlx::query_as::<_, Note>(&format!(
            "INSERT INTO notes ({NOTE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(note.id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.user_id)
        .bind(note.tenant_id)
        .bind(note.created_at)
        .bind(note.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(note))
    }

    async fn update_note(
        &self,
        tenant_id: Uuid,
        note_id: Uuid,
        title: Option<String>,
        content: Option<String>,
    ) -> StoreResult<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(&format!(
            "UPDATE notes
             SET title = COALESCE($1, title), content = COALESCE($2, content), updated_at = $3
             WHERE id = $4 AND tenant_id = $5
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(Utc::now())
        .bind(note_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn delete_note(&self, tenant_id: Uuid, note_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM notes WHERE id = $1 AND tenant_id = $2")
            .bind(note_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
