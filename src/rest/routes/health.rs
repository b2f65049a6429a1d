use axum::{extract::State, Json};
use std::sync::Arc;

use crate::observability::HealthStatus;
use crate::AppContext;

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<HealthStatus> {
    let db_ok = ctx.storage.ping().await;
    let uptime_secs = ctx.started_at.elapsed().as_secs();
    Json(HealthStatus::ok(uptime_secs, db_ok))
}
