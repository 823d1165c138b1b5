//! Admin sign-in: login, refresh-token rotation, logout, and account
//! creation.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use toto_core::{ActivityKind, locale, validate};
use tracing::{info, instrument, warn};

use super::error::ApiError;
use super::middleware::client_ip;
use super::state::AppState;
use crate::auth::{JwtManager, password};
use crate::storage::{Account, Database, DatabaseError};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
    pub account_id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

/// Issue an access/refresh pair and persist the refresh token hash.
async fn issue_session(
    db: &Database,
    jwt: &JwtManager,
    account: &Account,
) -> Result<SessionResponse, ApiError> {
    let access = jwt.issue_access_token(account).map_err(ApiError::internal)?;
    let refresh = jwt.issue_refresh_token(account).map_err(ApiError::internal)?;

    let token_id = uuid::Uuid::new_v4().to_string();
    let token_hash = JwtManager::hash_token(&refresh.token);
    db.create_token(&token_id, &account.id, &token_hash, refresh.expires_at)
        .await?;

    Ok(SessionResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        expires_in_secs: jwt.access_ttl_secs(),
        account_id: account.id.clone(),
        email: account.email.clone(),
    })
}

/// Refuse a signed-in account that lacks the admin flag, revoking every
/// session it still holds.
async fn refuse_non_admin(db: &Database, account: &Account) -> ApiError {
    match db.revoke_account_tokens(&account.id).await {
        Ok(revoked) => warn!(account_id = %account.id, revoked, "Non-admin sign-in refused"),
        Err(e) => warn!(account_id = %account.id, error = %e, "Non-admin sign-in refused, revocation failed"),
    }
    ApiError::NotAdmin
}

/// `POST /api/auth/login`
#[instrument(skip(state, headers, req), fields(route = "login"))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation(locale::CREDENTIALS_REQUIRED));
    }

    let account = match state.db.get_account_by_email(email).await {
        Ok(account) => Some(account),
        Err(DatabaseError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let valid = password::check_login(
        &req.password,
        account.as_ref().map(|a| a.password_hash.as_str()),
    );
    let Some(account) = account.filter(|_| valid) else {
        warn!(email = %email, "Failed login attempt");
        return Err(ApiError::Unauthenticated(locale::BAD_CREDENTIALS.to_string()));
    };

    if !account.admin {
        return Err(refuse_non_admin(&state.db, &account).await);
    }

    let session = issue_session(&state.db, &state.jwt, &account).await?;
    state
        .db
        .log_activity(
            ActivityKind::Login,
            &locale::activity::login(&account.email),
            &account.email,
            &client_ip(&headers),
        )
        .await?;

    info!(account_id = %account.id, "Admin logged in");
    Ok(Json(session))
}

/// `POST /api/auth/refresh`: rotate a refresh token.
#[instrument(skip(state, req), fields(route = "refresh"))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let invalid = || ApiError::Unauthenticated(locale::LOGIN_REQUIRED.to_string());

    let claims = state.jwt.validate(&req.refresh_token).map_err(|_| invalid())?;
    if !claims.is_refresh() {
        return Err(ApiError::validation("Not a refresh token"));
    }

    let token_hash = JwtManager::hash_token(&req.refresh_token);
    let stored = state
        .db
        .get_token_by_hash(&token_hash)
        .await?
        .ok_or_else(invalid)?;

    // Rotation: the presented token is single-use.
    state.db.revoke_token(&stored.id).await?;

    let account = state.db.get_account(&stored.account_id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => invalid(),
        other => other.into(),
    })?;
    if !account.admin {
        return Err(refuse_non_admin(&state.db, &account).await);
    }

    Ok(Json(issue_session(&state.db, &state.jwt, &account).await?))
}

/// `POST /api/auth/logout`: revoke a refresh token.
#[instrument(skip(state, headers, req), fields(route = "logout"))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token_hash = JwtManager::hash_token(&req.refresh_token);
    let Some(stored) = state.db.get_token_by_hash(&token_hash).await? else {
        return Ok(Json(LogoutResponse { revoked: false }));
    };

    let revoked = state.db.revoke_token(&stored.id).await?;
    if let Ok(account) = state.db.get_account(&stored.account_id).await {
        state
            .db
            .log_activity(
                ActivityKind::Logout,
                &locale::activity::logout(&account.email),
                &account.email,
                &client_ip(&headers),
            )
            .await?;
    }

    Ok(Json(LogoutResponse { revoked }))
}

/// Create an admin account. Shared by the HTTP surface and the CLI
/// bootstrap subcommand.
pub async fn create_admin_account(
    db: &Database,
    email: &str,
    password: &str,
) -> Result<Account, ApiError> {
    let email = validate::email(email)?;
    let password = validate::password(password)?;

    match db.get_account_by_email(email).await {
        Ok(_) => return Err(ApiError::Conflict(format!("Account {email} already exists"))),
        Err(DatabaseError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let hash = password::hash_password(password).map_err(ApiError::internal)?;
    let id = uuid::Uuid::new_v4().to_string();
    let account = db.create_account(&id, email, &hash, true).await?;

    info!(account_id = %account.id, "Admin account created");
    Ok(account)
}
