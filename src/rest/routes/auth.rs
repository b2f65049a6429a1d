use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::rest::{domain_error, request_token, require_user, ApiError};
use crate::AppContext;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = ctx
        .users
        .login(&body.username, &body.password)
        .await
        .map_err(domain_error)?;
    let token = ctx.sessions.issue(user.clone()).await;
    info!(username = %user.username, "login");
    Ok(Json(json!({
        "token": token,
        "user": {
            "username": user.username,
            "full_name": user.full_name,
            "department": user.department,
            "is_admin": user.is_admin,
        },
    })))
}

pub async fn logout(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    // Resolve first so an unauthenticated call still gets a 401.
    let user = require_user(&ctx, &headers).await?;
    if let Some(token) = request_token(&headers) {
        ctx.sessions.revoke(&token).await;
    }
    info!(username = %user.username, "logout");
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

pub async fn change_password(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&ctx, &headers).await?;
    ctx.users
        .change_password(&user.username, &body.new_password)
        .await
        .map_err(domain_error)?;
    Ok(Json(json!({ "ok": true })))
}
