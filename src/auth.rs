//! Users and sessions.
//!
//! Credentials are checked against the `users` table exactly as the
//! legacy system did: plain-text comparison, no hashing, no lockout.
//! Hardening is out of scope for this service; it runs on a trusted
//! internal network.
//!
//! Sessions are in-memory only: a login issues a random bearer token
//! mapped to the authenticated user, and a restart logs everyone out.
//! Handlers receive the resolved [`CurrentUser`] explicitly — there is
//! no ambient "who is logged in" global.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::DomainError;
use crate::storage::{Storage, UserRow};

/// The authenticated caller, resolved from a bearer token per request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CurrentUser {
    pub username: String,
    pub full_name: String,
    pub department: String,
    pub is_admin: bool,
}

impl From<&UserRow> for CurrentUser {
    fn from(row: &UserRow) -> Self {
        Self {
            username: row.username.clone(),
            full_name: row.full_name.clone(),
            department: row.department.clone(),
            is_admin: row.is_admin,
        }
    }
}

// ─── User directory ──────────────────────────────────────────────────────────

/// User CRUD over the storage layer.
#[derive(Clone)]
pub struct UserDirectory {
    storage: Arc<Storage>,
}

impl UserDirectory {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Check a username/password pair. Wrong username and wrong password
    /// are indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<CurrentUser, DomainError> {
        let Some(user) = self.storage.get_user(username).await? else {
            return Err(DomainError::BadCredentials);
        };
        if user.password != password {
            return Err(DomainError::BadCredentials);
        }
        Ok(CurrentUser::from(&user))
    }

    /// Create a regular (non-admin) user. Admin-only at the API layer.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
        department: &str,
        phone: &str,
    ) -> Result<CurrentUser, DomainError> {
        if username.trim().is_empty() {
            return Err(DomainError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(DomainError::MissingField("password"));
        }
        if self.storage.get_user(username).await?.is_some() {
            return Err(DomainError::DuplicateUser(username.to_string()));
        }
        let row = self
            .storage
            .insert_user(username, password, full_name, department, phone, false)
            .await?;
        info!(username, "user created");
        Ok(CurrentUser::from(&row))
    }

    /// A user changing their own password.
    pub async fn change_password(
        &self,
        username: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        if new_password.is_empty() {
            return Err(DomainError::MissingField("password"));
        }
        if !self.storage.update_password(username, new_password).await? {
            return Err(DomainError::UnknownUser(username.to_string()));
        }
        Ok(())
    }

    /// Admin reset to the configured default password.
    pub async fn reset_password(
        &self,
        username: &str,
        default_password: &str,
    ) -> Result<(), DomainError> {
        if !self
            .storage
            .update_password(username, default_password)
            .await?
        {
            return Err(DomainError::UnknownUser(username.to_string()));
        }
        info!(username, "password reset by admin");
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<UserRow>, DomainError> {
        Ok(self.storage.list_users().await?)
    }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// In-memory bearer-token session table.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, CurrentUser>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for an authenticated user.
    ///
    /// Token format follows the daemon auth-token convention: UUID v4,
    /// hex without dashes (32 chars).
    pub async fn issue(&self, user: CurrentUser) -> String {
        let token = Uuid::new_v4().to_string().replace('-', "");
        self.sessions.write().await.insert(token.clone(), user);
        token
    }

    /// Resolve a token to its user, if the session is live.
    pub async fn resolve(&self, token: &str) -> Option<CurrentUser> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Drop a session. Unknown tokens are a no-op.
    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

/// Extract the token from a `Bearer <token>` authorization header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}
