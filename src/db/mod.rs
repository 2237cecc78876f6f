pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    note::Note,
    tenant::{PlanType, Tenant},
    user::{NewUser, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated")]
    Conflict,

    /// The referenced tenant row does not exist (deleted concurrently).
    #[error("referenced tenant does not exist")]
    MissingTenant,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StoreError::Conflict,
            Some(db) if db.is_foreign_key_violation() => StoreError::MissingTenant,
            _ => StoreError::Backend(e.into()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Users and tenants. `insert_user` must be atomic with respect to the global
/// email uniqueness constraint: of two concurrent inserts for one email,
/// exactly one succeeds and the other returns `StoreError::Conflict`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Lookup by id restricted to one tenant.
    async fn find_user_in_tenant(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> StoreResult<Option<Tenant>>;

    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>>;

    async fn update_tenant_plan(&self, tenant_id: Uuid, plan: PlanType) -> StoreResult<Option<Tenant>>;
}

/// Tenant-keyed note storage. Every call names the acting tenant and never
/// returns or touches a row of another tenant.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_notes(&self, tenant_id: Uuid) -> StoreResult<Vec<Note>>;

    async fn get_note(&self, tenant_id: Uuid, note_id: Uuid) -> StoreResult<Option<Note>>;

    /// Inserts unless the tenant already holds `limit` notes, in which case
    /// `Ok(None)`. The count and the insert are one atomic step per tenant.
    async fn insert_note(&self, note: Note, limit: Option<i64>) -> StoreResult<Option<Note>>;

    async fn update_note(
        &self,
        tenant_id: Uuid,
        note_id: Uuid,
        title: Option<String>,
        content: Option<String>,
    ) -> StoreResult<Option<Note>>;

    async fn delete_note(&self, tenant_id: Uuid, note_id: Uuid) -> StoreResult<bool>;
}

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
