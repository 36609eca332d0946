//! Account service
//!
//! The account lifecycle: register, login, session authorization, and logout.
//! Wraps the user store with the credential and token policies.

use tracing::debug;

use super::store::{Account, UserStore};
use super::{
    constant_time_eq, generate_token, hash_password, verify_password, AuthError, TOKEN_BYTES,
};

/// Token pair issued by a successful login
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub session_token: String,
    pub csrf_token: String,
}

/// Account service for authentication operations
#[derive(Clone)]
pub struct AccountService {
    store: UserStore,
    min_credential_len: usize,
}

impl AccountService {
    /// Create a new account service over the store
    pub fn new(store: UserStore, min_credential_len: usize) -> Self {
        Self {
            store,
            min_credential_len,
        }
    }

    /// Register a new account.
    ///
    /// Username and password must each meet the minimum length policy.
    /// Registration leaves the account logged out (empty token pair).
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        if username.len() < self.min_credential_len || password.len() < self.min_credential_len {
            return Err(AuthError::InvalidInput(self.min_credential_len));
        }

        let password_hash = hash_password(password)?;
        self.store.create(username, &password_hash).await
    }

    /// Login with username and password, issuing a fresh token pair.
    ///
    /// Unknown username and wrong password produce the identical error.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Account, SessionTokens), AuthError> {
        let Some(stored_hash) = self.store.password_hash(username).await? else {
            // Burn one hash so an unknown username costs the same as a
            // failed verification.
            let _ = hash_password(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &stored_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        // Two independent draws; the CSRF token is not derived from the
        // session token.
        let session_token = generate_token(TOKEN_BYTES)?;
        let csrf_token = generate_token(TOKEN_BYTES)?;

        if !self
            .store
            .set_session_tokens(username, &session_token, &csrf_token)
            .await?
        {
            // Account vanished between the credential read and the token
            // write; indistinguishable from bad credentials to the caller.
            return Err(AuthError::InvalidCredentials);
        }

        let account = self
            .store
            .get(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok((
            account,
            SessionTokens {
                session_token,
                csrf_token,
            },
        ))
    }

    /// Validate a presented session token for the claimed username.
    ///
    /// Every failure mode collapses to `Unauthorized` for the caller; the
    /// distinct reasons are only logged.
    pub async fn authorize(&self, username: &str, presented: &str) -> Result<Account, AuthError> {
        if username.is_empty() || presented.is_empty() {
            debug!(reason = "missing username or session token", "authorization rejected");
            return Err(AuthError::Unauthorized);
        }

        let Some((session_token, _)) = self.store.session_tokens(username).await? else {
            debug!(username, reason = "unknown account", "authorization rejected");
            return Err(AuthError::Unauthorized);
        };

        if session_token.is_empty() {
            debug!(username, reason = "no active session", "authorization rejected");
            return Err(AuthError::Unauthorized);
        }

        if !constant_time_eq(session_token.as_bytes(), presented.as_bytes()) {
            debug!(username, reason = "session token mismatch", "authorization rejected");
            return Err(AuthError::Unauthorized);
        }

        self.store
            .get(username)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    /// Validate a submitted CSRF token for the claimed username.
    ///
    /// Separate from `authorize`: state-changing endpoints call both.
    pub async fn verify_csrf(&self, username: &str, presented: &str) -> Result<(), AuthError> {
        if username.is_empty() || presented.is_empty() {
            debug!(reason = "missing username or csrf token", "csrf check rejected");
            return Err(AuthError::Unauthorized);
        }

        let Some((_, csrf_token)) = self.store.session_tokens(username).await? else {
            debug!(username, reason = "unknown account", "csrf check rejected");
            return Err(AuthError::Unauthorized);
        };

        if csrf_token.is_empty() || !constant_time_eq(csrf_token.as_bytes(), presented.as_bytes())
        {
            debug!(username, reason = "csrf token mismatch", "csrf check rejected");
            return Err(AuthError::Unauthorized);
        }

        Ok(())
    }

    /// Logout: requires a valid session, then clears both tokens
    pub async fn logout(&self, username: &str, presented: &str) -> Result<(), AuthError> {
        self.authorize(username, presented).await?;
        self.store.clear_session_tokens(username).await?;
        Ok(())
    }
}
