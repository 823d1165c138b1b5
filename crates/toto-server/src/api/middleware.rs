//! Bearer-token guard for the admin surface.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use toto_core::locale;
use tracing::warn;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::{Claims, JwtManager};

/// Extract and validate the access token from the `Authorization` header.
pub fn bearer_claims(jwt: &JwtManager, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthenticated(locale::LOGIN_REQUIRED.to_string()))?;

    let claims = jwt
        .validate(token)
        .map_err(|_| ApiError::Unauthenticated(locale::LOGIN_REQUIRED.to_string()))?;

    if !claims.is_access() {
        return Err(ApiError::Unauthenticated("Not an access token".to_string()));
    }
    Ok(claims)
}

/// Admit only access tokens carrying `admin = true`.
///
/// A valid token without the claim is a signed-in non-admin: every refresh
/// token of that account is revoked before the request is refused.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state.jwt, req.headers())?;

    if !claims.admin {
        let revoked = state.db.revoke_account_tokens(&claims.sub).await?;
        warn!(account_id = %claims.sub, revoked, "Non-admin token refused, session revoked");
        return Err(ApiError::NotAdmin);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Client address for the activity log, when a proxy forwarded one.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::Account;
    use axum::http::HeaderValue;

    fn jwt() -> JwtManager {
        JwtManager::new(b"test-secret", 3600, 86400)
    }

    fn account() -> Account {
        Account {
            id: "a1".into(),
            email: "admin@toto.live".into(),
            password_hash: String::new(),
            admin: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn valid_access_token_passes() {
        let jwt = jwt();
        let issued = jwt.issue_access_token(&account()).unwrap();
        let claims = bearer_claims(&jwt, &headers_with(&issued.token)).unwrap();
        assert_eq!(claims.sub, "a1");
    }

    #[test]
    fn missing_header_fails() {
        let err = bearer_claims(&jwt(), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn refresh_token_rejected() {
        let jwt = jwt();
        let issued = jwt.issue_refresh_token(&account()).unwrap();
        let err = bearer_claims(&jwt, &headers_with(&issued.token)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn forwarded_ip_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new()), "");
    }
}
