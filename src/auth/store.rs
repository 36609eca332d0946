//! User store - exclusive owner of account records
//!
//! All access goes through username-keyed operations; every mutation is a
//! single SQL statement so concurrent requests for the same username cannot
//! interleave a read-modify-write.

use sqlx::sqlite::SqlitePool;

use super::AuthError;

/// Account data exposed to callers. The password hash and token pair stay
/// inside the store and are read through dedicated operations.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

/// Username-keyed account store over the SQLite pool
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Create a new store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account with empty session state.
    ///
    /// The UNIQUE constraint on `username` makes the duplicate check and the
    /// insert one atomic step; two concurrent registrations of the same name
    /// cannot both succeed.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<Account, AuthError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO accounts (id, username, password_hash, session_token, csrf_token, created_at)
             VALUES (?, ?, ?, '', '', ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Account {
                id,
                username: username.to_string(),
                created_at: now,
            }),
            Err(sqlx::Error::Database(db))
                if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                Err(AuthError::DuplicateUser)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up an account by username
    pub async fn get(&self, username: &str) -> Result<Option<Account>, AuthError> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, username, created_at FROM accounts WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, username, created_at)| Account {
            id,
            username,
            created_at,
        }))
    }

    /// Read the stored password hash for a username
    pub async fn password_hash(&self, username: &str) -> Result<Option<String>, AuthError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM accounts WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(hash,)| hash))
    }

    /// Read the stored (session, csrf) token pair for a username.
    ///
    /// Both strings are empty when the account has no active session.
    pub async fn session_tokens(
        &self,
        username: &str,
    ) -> Result<Option<(String, String)>, AuthError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT session_token, csrf_token FROM accounts WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row)
    }

    /// Set both session tokens in one statement.
    ///
    /// Returns false if no account exists for the username.
    pub async fn set_session_tokens(
        &self,
        username: &str,
        session_token: &str,
        csrf_token: &str,
    ) -> Result<bool, AuthError> {
        let result =
            sqlx::query("UPDATE accounts SET session_token = ?, csrf_token = ? WHERE username = ?")
                .bind(session_token)
                .bind(csrf_token)
                .bind(username)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clear both session tokens in one statement
    pub async fn clear_session_tokens(&self, username: &str) -> Result<bool, AuthError> {
        let result =
            sqlx::query("UPDATE accounts SET session_token = '', csrf_token = '' WHERE username = ?")
                .bind(username)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
