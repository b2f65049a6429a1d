//! Goal store: monthly goal snapshots and the append-only performance log.
//!
//! `monthly_goals` holds one row per (username, month) and is only ever
//! written through the upsert below. `performance_logs` rows are written
//! once and never updated or deleted.

use anyhow::{Context as _, Result};
use chrono::Utc;

use super::{with_timeout, Storage};

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct GoalRow {
    pub id: i64,
    pub username: String,
    /// Month token `YYYY-MM`.
    pub month: String,
    /// 0 means "not set yet". Once positive, the update workflow never
    /// changes it again (application rule, not a schema constraint).
    pub target_amount: f64,
    pub completed_amount: f64,
    pub revenue_amount: f64,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct PerformanceLogRow {
    pub id: i64,
    pub username: String,
    pub month: String,
    /// The delta submitted in one update call — not the cumulative total.
    pub added_completed: f64,
    pub added_revenue: f64,
    pub created_at: String,
}

impl Storage {
    /// Current snapshot for (username, month), if one exists.
    pub async fn get_goal(&self, username: &str, month: &str) -> Result<Option<GoalRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM monthly_goals WHERE username = ? AND month = ?")
                .bind(username)
                .bind(month)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Every user's snapshot for a month, for the ranking/overview table.
    pub async fn list_goals(&self, month: &str) -> Result<Vec<GoalRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM monthly_goals WHERE month = ?
                 ORDER BY completed_amount DESC, username ASC",
            )
            .bind(month)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    /// Write the full snapshot for (username, month): insert the row if the
    /// pair is new, overwrite it otherwise. The caller supplies final
    /// cumulative totals, not deltas.
    pub async fn upsert_goal(
        &self,
        username: &str,
        month: &str,
        target_amount: f64,
        completed_amount: f64,
        revenue_amount: f64,
    ) -> Result<GoalRow> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO monthly_goals
               (username, month, target_amount, completed_amount, revenue_amount, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(username, month) DO UPDATE SET
               target_amount = excluded.target_amount,
               completed_amount = excluded.completed_amount,
               revenue_amount = excluded.revenue_amount,
               updated_at = excluded.updated_at",
        )
        .bind(username)
        .bind(month)
        .bind(target_amount)
        .bind(completed_amount)
        .bind(revenue_amount)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Upserting monthly goal")?;
        self.get_goal(username, month)
            .await?
            .ok_or_else(|| anyhow::anyhow!("goal not found after upsert"))
    }

    /// Append one log entry carrying the deltas of a single submission.
    pub async fn append_performance_log(
        &self,
        username: &str,
        month: &str,
        added_completed: f64,
        added_revenue: f64,
    ) -> Result<PerformanceLogRow> {
        let now = Utc::now().to_rfc3339();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO performance_logs (username, month, added_completed, added_revenue, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(username)
        .bind(month)
        .bind(added_completed)
        .bind(added_revenue)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .context("Appending performance log entry")?;
        Ok(
            sqlx::query_as("SELECT * FROM performance_logs WHERE id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Submission history for (username, month), newest first.
    pub async fn list_performance_logs(
        &self,
        username: &str,
        month: &str,
    ) -> Result<Vec<PerformanceLogRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM performance_logs
                 WHERE username = ? AND month = ?
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(username)
            .bind(month)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }
}
