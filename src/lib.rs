// Library exports for the binary and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use config::Config;
use db::{CredentialStore, DocumentStore};
use services::{
    auth::AuthService, invitation::InvitationManager, notes::NoteService, password::PasswordHasher,
    session::SessionManager, token::TokenCodec,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn CredentialStore>,
    pub sessions: Arc<SessionManager>,
    pub invitations: Arc<InvitationManager>,
    pub auth: Arc<AuthService>,
    pub notes: Arc<NoteService>,
}

impl AppState {
    /// Builds the single token codec from the configured secret and hands it
    /// to every component that signs or verifies.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn CredentialStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.jwt_secret));
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let sessions = Arc::new(SessionManager::new(codec.clone(), config.production));
        let invitations = Arc::new(InvitationManager::new(
            codec,
            store.clone(),
            sessions.clone(),
            hasher,
            config.app_base_url.clone(),
        ));
        let auth = Arc::new(AuthService::new(store.clone(), sessions.clone(), hasher));
        let notes = Arc::new(NoteService::new(documents, store.clone()));

        Self {
            config,
            store,
            sessions,
            invitations,
            auth,
            notes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/profile", get(routes::auth::profile))
        .route("/api/auth/invite", post(routes::auth::invite_user))
        .route(
            "/api/auth/accept-invite",
            get(routes::auth::inspect_invite).post(routes::auth::accept_invite),
        )
        // Tenant user management
        .route("/api/users/invite", post(routes::users::create_user))
        // Notes
        .route("/api/notes", get(routes::notes::list_notes).post(routes::notes::create_note))
        .route(
            "/api/notes/{id}",
            get(routes::notes::get_note)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        // Tenants
        .route("/api/tenants/{slug}/upgrade", post(routes::tenants::upgrade_tenant))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
