// rest/mod.rs — HTTP JSON API.
//
// Axum server, local only by default. Bearer-token sessions: everything
// except /health and /login requires an Authorization header carrying a
// token issued by POST /login.
//
// Endpoints:
//   GET  /api/v1/health
//   POST /api/v1/login
//   POST /api/v1/logout
//   PUT  /api/v1/password
//   GET  /api/v1/users                        (admin)
//   POST /api/v1/users                        (admin)
//   POST /api/v1/users/{username}/reset-password  (admin)
//   GET  /api/v1/reports
//   POST /api/v1/reports
//   GET  /api/v1/reports/previous
//   GET  /api/v1/reports/authors
//   GET  /api/v1/goals/{month}
//   POST /api/v1/goals/{month}
//   GET  /api/v1/goals/{month}/me
//   GET  /api/v1/goals/{month}/logs

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::auth::{bearer_token, CurrentUser};
use crate::error::DomainError;
use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(routes::health::health))
        // Auth
        .route("/api/v1/login", post(routes::auth::login))
        .route("/api/v1/logout", post(routes::auth::logout))
        .route("/api/v1/password", put(routes::auth::change_password))
        // Users (admin)
        .route(
            "/api/v1/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/api/v1/users/{username}/reset-password",
            post(routes::users::reset_password),
        )
        // Daily reports
        .route(
            "/api/v1/reports",
            get(routes::reports::list_reports).post(routes::reports::submit_report),
        )
        .route(
            "/api/v1/reports/previous",
            get(routes::reports::previous_report),
        )
        .route("/api/v1/reports/authors", get(routes::reports::authors))
        // Monthly goals
        .route(
            "/api/v1/goals/{month}",
            get(routes::goals::all_goals).post(routes::goals::submit_update),
        )
        .route("/api/v1/goals/{month}/me", get(routes::goals::my_goal))
        .route("/api/v1/goals/{month}/logs", get(routes::goals::my_logs))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

// ─── Shared handler plumbing ─────────────────────────────────────────────────

pub(crate) type ApiError = (StatusCode, Json<Value>);

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Map a domain error to an HTTP response.
pub(crate) fn domain_error(e: DomainError) -> ApiError {
    let status = match &e {
        DomainError::BadCredentials => StatusCode::UNAUTHORIZED,
        DomainError::UnknownUser(_) => StatusCode::NOT_FOUND,
        DomainError::DuplicateUser(_) => StatusCode::CONFLICT,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    error_body(status, e.to_string())
}

/// Resolve the bearer token on a request to its session user.
pub(crate) async fn require_user(
    ctx: &AppContext,
    headers: &HeaderMap,
) -> Result<CurrentUser, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| error_body(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    ctx.sessions
        .resolve(token)
        .await
        .ok_or_else(|| error_body(StatusCode::UNAUTHORIZED, "invalid or expired session"))
}

/// Like [`require_user`] but additionally requires the admin flag.
pub(crate) async fn require_admin(
    ctx: &AppContext,
    headers: &HeaderMap,
) -> Result<CurrentUser, ApiError> {
    let user = require_user(ctx, headers).await?;
    if !user.is_admin {
        return Err(error_body(StatusCode::FORBIDDEN, "admin access required"));
    }
    Ok(user)
}

/// The raw token on a request, for logout.
pub(crate) fn request_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(|t| t.to_string())
}
