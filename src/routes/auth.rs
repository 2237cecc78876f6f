use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    error::AuthError,
    middleware::auth::AdminPrincipal,
    models::{
        auth::Principal,
        user::{AcceptInviteRequest, InviteTokenQuery, InviteUserRequest, LoginRequest},
    },
    AppState,
};

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AuthError::Validation("Email and password are required"));
    };
    let (_, token) = state.auth.login(&email, &password).await?;
    Ok((
        [(header::SET_COOKIE, state.sessions.session_cookie(&token))],
        Json(json!({ "message": "Login successful" })),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.sessions.clear_session_cookie())],
        Json(json!({ "message": "Logout successful" })),
    )
}

pub async fn profile(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AuthError> {
    let profile = state.auth.profile(&principal).await?;
    Ok(Json(profile))
}

pub async fn invite_user(
    State(state): State<AppState>,
    AdminPrincipal(principal): AdminPrincipal,
    body: Result<Json<InviteUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    let invitation_link = state
        .invitations
        .create_invitation(
            &principal,
            body.email.as_deref().unwrap_or_default(),
            body.role.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "invitationLink": invitation_link })))
}

/// Preview for the acceptance page. No session required.
pub async fn inspect_invite(
    State(state): State<AppState>,
    Query(query): Query<InviteTokenQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Validation("Missing token"))?;
    let preview = state.invitations.inspect_invitation(&token).await?;
    Ok(Json(preview))
}

/// Creates the account and signs the new user in.
pub async fn accept_invite(
    State(state): State<AppState>,
    body: Result<Json<AcceptInviteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    let (Some(token), Some(password)) = (
        body.token.filter(|t| !t.is_empty()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AuthError::Validation("Token and password required"));
    };

    let accepted = state.invitations.accept_invitation(&token, &password).await?;
    Ok((
        [(
            header::SET_COOKIE,
            state.sessions.session_cookie(&accepted.session_token),
        )],
        Json(json!({
            "message": "Invitation accepted",
            "user": { "id": accepted.user.id, "email": accepted.user.email },
        })),
    ))
}
