use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::goals::{GoalUpdate, SubmitOutcome};
use crate::rest::{domain_error, require_user, ApiError};
use crate::AppContext;

/// Every user's snapshot for a month — the team overview table.
pub async fn all_goals(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(month): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_user(&ctx, &headers).await?;
    let goals = ctx.goals.all_goals(&month).await.map_err(domain_error)?;
    Ok(Json(json!({ "month": month, "goals": goals })))
}

/// The caller's own snapshot, or `null` when no goal is set yet.
pub async fn my_goal(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(month): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&ctx, &headers).await?;
    let goal = ctx
        .goals
        .get_goal(&user.username, &month)
        .await
        .map_err(domain_error)?;
    Ok(Json(json!({ "month": month, "goal": goal })))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct SubmitUpdateRequest {
    pub proposed_target: f64,
    pub added_completed: f64,
    pub added_revenue: f64,
}

pub async fn submit_update(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(month): Path<String>,
    Json(body): Json<SubmitUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&ctx, &headers).await?;
    let update = GoalUpdate {
        proposed_target: body.proposed_target,
        added_completed: body.added_completed,
        added_revenue: body.added_revenue,
    };
    let outcome = ctx
        .goals
        .submit(&user.username, &month, update)
        .await
        .map_err(domain_error)?;
    match outcome {
        SubmitOutcome::NothingToUpdate => Ok(Json(json!({
            "updated": false,
            "message": "nothing to update",
        }))),
        SubmitOutcome::Updated { goal, log } => Ok(Json(json!({
            "updated": true,
            "goal": goal,
            "log": log,
        }))),
    }
}

/// The caller's submission history for a month, newest first.
pub async fn my_logs(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(month): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&ctx, &headers).await?;
    let logs = ctx
        .goals
        .logs(&user.username, &month)
        .await
        .map_err(domain_error)?;
    Ok(Json(json!({ "month": month, "logs": logs })))
}
