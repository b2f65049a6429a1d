use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::rest::{domain_error, error_body, require_user, ApiError};
use crate::time;
use crate::AppContext;

/// All reports, visible to every authenticated user.
pub async fn list_reports(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_user(&ctx, &headers).await?;
    let reports = ctx
        .storage
        .list_reports()
        .await
        .map_err(|e| domain_error(e.into()))?;
    Ok(Json(json!({ "reports": reports })))
}

#[derive(Deserialize)]
pub struct SubmitReportRequest {
    /// Business date; defaults to today in Beijing time.
    pub report_date: Option<String>,
    pub work_content: String,
    #[serde(default)]
    pub next_plan: String,
    #[serde(default)]
    pub problems: String,
}

pub async fn submit_report(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<SubmitReportRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&ctx, &headers).await?;

    let work_content = body.work_content.trim();
    if work_content.is_empty() {
        return Err(error_body(StatusCode::BAD_REQUEST, "work_content is required"));
    }
    let report_date = body.report_date.unwrap_or_else(time::today);
    if !time::is_valid_date(&report_date) {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            format!("invalid report date: {report_date:?} (expected YYYY-MM-DD)"),
        ));
    }

    let report = ctx
        .storage
        .insert_report(
            &user.full_name,
            &report_date,
            work_content,
            body.next_plan.trim(),
            body.problems.trim(),
        )
        .await
        .map_err(|e| domain_error(e.into()))?;
    Ok(Json(json!({ "report": report })))
}

#[derive(Deserialize)]
pub struct PreviousQuery {
    /// Defaults to today; the lookup is strictly before this date.
    pub date: Option<String>,
}

/// The caller's latest report before a date — used to prefill
/// "yesterday's plan" when drafting a new report.
pub async fn previous_report(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(query): Query<PreviousQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&ctx, &headers).await?;
    let date = query.date.unwrap_or_else(time::today);
    if !time::is_valid_date(&date) {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            format!("invalid date: {date:?} (expected YYYY-MM-DD)"),
        ));
    }
    let previous = ctx
        .storage
        .previous_report(&user.full_name, &date)
        .await
        .map_err(|e| domain_error(e.into()))?;
    Ok(Json(json!({ "previous": previous })))
}

pub async fn authors(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_user(&ctx, &headers).await?;
    let authors = ctx
        .storage
        .report_authors()
        .await
        .map_err(|e| domain_error(e.into()))?;
    Ok(Json(json!({ "authors": authors })))
}
