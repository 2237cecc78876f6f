use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    error::AuthError,
    middleware::auth::AdminPrincipal,
    models::user::CreateUserRequest,
    AppState,
};

/// Create a user directly in the admin's tenant (no invitation round trip).
pub async fn create_user(
    State(state): State<AppState>,
    AdminPrincipal(principal): AdminPrincipal,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    let user = state
        .auth
        .create_user_directly(
            &principal,
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
            body.role.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User invited successfully", "user": user })),
    ))
}
