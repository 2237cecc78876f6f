use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{error::AuthError, models::auth::Principal, AppState};

pub async fn upgrade_tenant(
    State(state): State<AppState>,
    principal: Principal,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    let tenant = state.notes.upgrade_tenant(&principal, &slug).await?;
    Ok(Json(json!({
        "message": "Tenant upgraded to Pro successfully",
        "tenant": tenant,
    })))
}
