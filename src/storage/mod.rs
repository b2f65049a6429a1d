pub mod goals;

use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the server indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
pub(crate) async fn with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub username: String,
    /// Stored in plain text, matching the legacy system this replaces.
    pub password: String,
    pub full_name: String,
    pub department: String,
    pub phone: String,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ReportRow {
    pub id: i64,
    pub employee_name: String,
    /// Business date `YYYY-MM-DD` (Beijing time), distinct from `created_at`.
    pub report_date: String,
    pub work_content: String,
    /// The plan for the next working day; surfaced as a prefill when the
    /// same employee writes their next report.
    pub next_plan: String,
    pub problems: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("reportd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            use sqlx::ConnectOptions as _;
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory storage for tests.
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect(":memory:").await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password TEXT NOT NULL,
                full_name TEXT NOT NULL,
                department TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_name TEXT NOT NULL,
                report_date TEXT NOT NULL,
                work_content TEXT NOT NULL,
                next_plan TEXT NOT NULL DEFAULT '',
                problems TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reports_employee_date
                ON reports(employee_name, report_date);

            CREATE TABLE IF NOT EXISTS monthly_goals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                month TEXT NOT NULL,
                target_amount REAL NOT NULL DEFAULT 0,
                completed_amount REAL NOT NULL DEFAULT 0,
                revenue_amount REAL NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                UNIQUE(username, month)
            );

            CREATE TABLE IF NOT EXISTS performance_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                month TEXT NOT NULL,
                added_completed REAL NOT NULL DEFAULT 0,
                added_revenue REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_performance_logs_user_month
                ON performance_logs(username, month);
            ",
        )
        .execute(pool)
        .await
        .context("Creating reportd tables")?;
        Ok(())
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    pub async fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn insert_user(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
        department: &str,
        phone: &str,
        is_admin: bool,
    ) -> Result<UserRow> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (username, password, full_name, department, phone, is_admin, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password)
        .bind(full_name)
        .bind(department)
        .bind(phone)
        .bind(is_admin)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_user(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn update_password(&self, username: &str, new_password: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE username = ?")
            .bind(new_password)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_users(&self) -> Result<Vec<UserRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn count_users(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    // ─── Daily reports ──────────────────────────────────────────────────────

    pub async fn insert_report(
        &self,
        employee_name: &str,
        report_date: &str,
        work_content: &str,
        next_plan: &str,
        problems: &str,
    ) -> Result<ReportRow> {
        let now = Utc::now().to_rfc3339();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO reports (employee_name, report_date, work_content, next_plan, problems, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(employee_name)
        .bind(report_date)
        .bind(work_content)
        .bind(next_plan)
        .bind(problems)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .context("Inserting daily report")?;
        self.get_report(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("report not found after insert"))
    }

    pub async fn get_report(&self, id: i64) -> Result<Option<ReportRow>> {
        Ok(sqlx::query_as("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// All reports, newest business date first, newest submission first
    /// within a date. Every authenticated user may read every report.
    pub async fn list_reports(&self) -> Result<Vec<ReportRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM reports ORDER BY report_date DESC, created_at DESC",
            )
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    /// The latest report by `employee_name` strictly before `before_date`.
    /// Used to surface "yesterday's plan" when drafting today's report.
    pub async fn previous_report(
        &self,
        employee_name: &str,
        before_date: &str,
    ) -> Result<Option<ReportRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM reports
             WHERE employee_name = ? AND report_date < ?
             ORDER BY report_date DESC, created_at DESC
             LIMIT 1",
        )
        .bind(employee_name)
        .bind(before_date)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Sorted distinct employee names, for filter dropdowns.
    pub async fn report_authors(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT employee_name FROM reports ORDER BY employee_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_storage() -> Storage {
        Storage::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let storage = make_storage().await;
        storage
            .insert_user("zhang.wei", "pw", "Zhang Wei", "Sales", "13800000000", false)
            .await
            .unwrap();
        let user = storage.get_user("zhang.wei").await.unwrap().unwrap();
        assert_eq!(user.full_name, "Zhang Wei");
        assert!(!user.is_admin);
        assert_eq!(storage.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_by_schema() {
        let storage = make_storage().await;
        storage
            .insert_user("a", "pw", "A", "", "", false)
            .await
            .unwrap();
        assert!(storage
            .insert_user("a", "pw2", "A2", "", "", false)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_update_password() {
        let storage = make_storage().await;
        storage
            .insert_user("a", "old", "A", "", "", false)
            .await
            .unwrap();
        assert!(storage.update_password("a", "new").await.unwrap());
        assert_eq!(storage.get_user("a").await.unwrap().unwrap().password, "new");
        // Unknown user: no rows touched.
        assert!(!storage.update_password("nobody", "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_report_ordering_and_authors() {
        let storage = make_storage().await;
        storage
            .insert_report("li.na", "2026-08-24", "visits", "follow up", "")
            .await
            .unwrap();
        storage
            .insert_report("zhang.wei", "2026-08-25", "calls", "demo", "none")
            .await
            .unwrap();
        let all = storage.list_reports().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].report_date, "2026-08-25");

        let authors = storage.report_authors().await.unwrap();
        assert_eq!(authors, vec!["li.na".to_string(), "zhang.wei".to_string()]);
    }

    #[tokio::test]
    async fn test_previous_report_is_strictly_before() {
        let storage = make_storage().await;
        storage
            .insert_report("li.na", "2026-08-23", "a", "plan-23", "")
            .await
            .unwrap();
        storage
            .insert_report("li.na", "2026-08-24", "b", "plan-24", "")
            .await
            .unwrap();

        let prev = storage
            .previous_report("li.na", "2026-08-25")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prev.next_plan, "plan-24");

        // Same-day report is not "previous".
        let prev = storage
            .previous_report("li.na", "2026-08-24")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prev.next_plan, "plan-23");

        assert!(storage
            .previous_report("li.na", "2026-08-23")
            .await
            .unwrap()
            .is_none());
    }
}
