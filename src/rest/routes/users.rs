use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::rest::{domain_error, require_admin, ApiError};
use crate::AppContext;

pub async fn list_users(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&ctx, &headers).await?;
    let users = ctx.users.list_users().await.map_err(domain_error)?;
    // Passwords never leave the server, plain text or not.
    let list: Vec<Value> = users
        .iter()
        .map(|u| {
            json!({
                "username": u.username,
                "full_name": u.full_name,
                "department": u.department,
                "phone": u.phone,
                "is_admin": u.is_admin,
                "created_at": u.created_at,
            })
        })
        .collect();
    Ok(Json(json!({ "users": list })))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub phone: String,
}

pub async fn create_user(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&ctx, &headers).await?;
    let user = ctx
        .users
        .create_user(
            &body.username,
            &body.password,
            &body.full_name,
            &body.department,
            &body.phone,
        )
        .await
        .map_err(domain_error)?;
    Ok(Json(json!({
        "username": user.username,
        "full_name": user.full_name,
        "department": user.department,
        "is_admin": user.is_admin,
    })))
}

pub async fn reset_password(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&ctx, &headers).await?;
    ctx.users
        .reset_password(&username, &ctx.config.reset_password)
        .await
        .map_err(domain_error)?;
    Ok(Json(json!({ "ok": true })))
}
