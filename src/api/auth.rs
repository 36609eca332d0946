//! Authentication API endpoints
//!
//! Four form-encoded POST operations. Login issues the session cookie
//! (HttpOnly) and the CSRF cookie (script-accessible, echoed back by the
//! client in the X-CSRF-Token header on state-changing requests).

use axum::{
    extract::State,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::AppState;
use crate::auth::AuthError;

const SESSION_COOKIE: &str = "session_token";
const CSRF_COOKIE: &str = "csrf_token";
const CSRF_HEADER: &str = "x-csrf-token";

/// Build auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/protected", post(protected))
}

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub username: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Register a new account
async fn register(
    State(state): State<AppState>,
    Form(req): Form<RegisterRequest>,
) -> impl IntoResponse {
    match state.accounts.register(&req.username, &req.password).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                username: account.username,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
}

/// Login with username and password, setting the session and CSRF cookies
async fn login(State(state): State<AppState>, Form(req): Form<LoginRequest>) -> impl IntoResponse {
    let (account, tokens) = match state.accounts.login(&req.username, &req.password).await {
        Ok(ok) => ok,
        Err(e) => return error_response(e),
    };

    let ttl = state.session_ttl_secs;
    let mut headers = HeaderMap::new();
    match (
        session_cookie(&tokens.session_token, ttl),
        csrf_cookie(&tokens.csrf_token, ttl),
    ) {
        (Ok(session), Ok(csrf)) => {
            headers.append(SET_COOKIE, session);
            headers.append(SET_COOKIE, csrf);
        }
        _ => {
            error!("failed to encode session cookies");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal error".to_string(),
                }),
            )
                .into_response();
        }
    }

    (
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            username: account.username,
        }),
    )
        .into_response()
}

/// Logout request
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub username: String,
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Logout: valid session + CSRF proof required, clears tokens and expires
/// both cookies
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<LogoutRequest>,
) -> impl IntoResponse {
    let Some(session) = extract_cookie(&headers, SESSION_COOKIE) else {
        debug!(reason = "missing session cookie", "logout rejected");
        return error_response(AuthError::Unauthorized);
    };
    let csrf = extract_csrf_header(&headers).unwrap_or_default();

    if let Err(e) = state.accounts.verify_csrf(&req.username, &csrf).await {
        return error_response(e);
    }
    if let Err(e) = state.accounts.logout(&req.username, &session).await {
        return error_response(e);
    }

    let mut response_headers = HeaderMap::new();
    response_headers.append(SET_COOKIE, clear_session_cookie());
    response_headers.append(SET_COOKIE, clear_csrf_cookie());

    (
        StatusCode::OK,
        response_headers,
        Json(LogoutResponse { success: true }),
    )
        .into_response()
}

/// Protected resource request
#[derive(Debug, Deserialize)]
pub struct ProtectedRequest {
    pub username: String,
}

/// Protected resource response
#[derive(Debug, Serialize)]
pub struct ProtectedResponse {
    pub message: String,
    pub username: String,
}

/// Access the protected resource: valid session + CSRF proof required
async fn protected(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<ProtectedRequest>,
) -> impl IntoResponse {
    let Some(session) = extract_cookie(&headers, SESSION_COOKIE) else {
        debug!(reason = "missing session cookie", "protected access rejected");
        return error_response(AuthError::Unauthorized);
    };
    let csrf = extract_csrf_header(&headers).unwrap_or_default();

    let account = match state.accounts.authorize(&req.username, &session).await {
        Ok(account) => account,
        Err(e) => return error_response(e),
    };
    if let Err(e) = state.accounts.verify_csrf(&req.username, &csrf).await {
        return error_response(e);
    }

    (
        StatusCode::OK,
        Json(ProtectedResponse {
            message: format!("Welcome, {}!", account.username),
            username: account.username,
        }),
    )
        .into_response()
}

/// Map a service error onto a client-visible status.
///
/// Internal faults are logged with detail but surface as a generic failure.
fn error_response(err: AuthError) -> Response {
    let (status, message) = match &err {
        AuthError::InvalidInput(min) => (
            StatusCode::BAD_REQUEST,
            format!("username and password must each be at least {min} characters"),
        ),
        AuthError::DuplicateUser => (
            StatusCode::CONFLICT,
            "username already exists".to_string(),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "invalid username or password".to_string(),
        ),
        AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
        AuthError::Hashing(_) | AuthError::Entropy(_) | AuthError::Database(_) => {
            error!("internal auth failure: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}

/// Session cookie: server-only, not script-accessible
fn session_cookie(token: &str, max_age_secs: u64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    ))
}

/// CSRF cookie: deliberately script-accessible so the client can read it and
/// echo it in the X-CSRF-Token header
fn csrf_cookie(token: &str, max_age_secs: u64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{CSRF_COOKIE}={token}; Path=/; SameSite=Lax; Max-Age={max_age_secs}"
    ))
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn clear_csrf_cookie() -> HeaderValue {
    HeaderValue::from_static("csrf_token=; Path=/; SameSite=Lax; Max-Age=0")
}

/// Pull a named cookie out of the Cookie header
fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_csrf_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CSRF_HEADER)?.to_str().ok()?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("csrf_token=abc; session_token=def"),
        );

        assert_eq!(
            extract_cookie(&headers, "session_token").as_deref(),
            Some("def")
        );
        assert_eq!(extract_cookie(&headers, "csrf_token").as_deref(), Some("abc"));
        assert!(extract_cookie(&headers, "other").is_none());
    }

    #[test]
    fn test_extract_cookie_missing_header() {
        let headers = HeaderMap::new();
        assert!(extract_cookie(&headers, "session_token").is_none());
    }

    #[test]
    fn test_cookie_attributes() {
        let session = session_cookie("tok", 86400).unwrap();
        let value = session.to_str().unwrap();
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=86400"));

        // The CSRF cookie must stay readable by client script
        let csrf = csrf_cookie("tok", 86400).unwrap();
        assert!(!csrf.to_str().unwrap().contains("HttpOnly"));
    }

    #[test]
    fn test_clear_cookies_expire_immediately() {
        assert!(clear_session_cookie().to_str().unwrap().contains("Max-Age=0"));
        assert!(clear_csrf_cookie().to_str().unwrap().contains("Max-Age=0"));
    }
}
