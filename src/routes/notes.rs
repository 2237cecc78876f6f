use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{auth::Principal, note::NoteRequest},
    AppState,
};

pub async fn list_notes(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(state.notes.list(&principal).await?))
}

pub async fn create_note(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    let note = state.notes.create(&principal, body.title, body.content).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(state.notes.get(&principal, id).await?))
}

pub async fn update_note(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    body: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    Ok(Json(state.notes.update(&principal, id, body.title, body.content).await?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthError> {
    state.notes.delete(&principal, id).await?;
    Ok(Json(json!({ "message": "Note deleted successfully" })))
}
