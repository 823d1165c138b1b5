//! JWT token issuance and validation.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use toto_core::db::unix_timestamp;

use super::claims::{Claims, TokenType};
use crate::storage::Account;

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Manages JWT token creation and validation.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given HS256 secret.
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn issue_access_token(
        &self,
        account: &Account,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue(account, TokenType::Access, self.access_ttl_secs)
    }

    pub fn issue_refresh_token(
        &self,
        account: &Account,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue(account, TokenType::Refresh, self.refresh_ttl_secs)
    }

    fn issue(
        &self,
        account: &Account,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: account.id.clone(),
            email: account.email.clone(),
            admin: account.admin,
            iat: now,
            exp: now + ttl_secs,
            token_type,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Validate a token's signature and expiry and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    /// Hash a token for storage (raw refresh tokens are never stored).
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_jwt() -> JwtManager {
        JwtManager::new(b"test-secret-key-for-testing", 3600, 86400)
    }

    fn account(admin: bool) -> Account {
        Account {
            id: "acct-1".into(),
            email: "admin@toto.live".into(),
            password_hash: String::new(),
            admin,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn access_token_carries_admin_claim() {
        let jwt = test_jwt();
        let issued = jwt.issue_access_token(&account(true)).unwrap();

        let claims = jwt.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, "acct-1");
        assert_eq!(claims.email, "admin@toto.live");
        assert!(claims.admin);
        assert!(claims.is_access());
        assert_eq!(issued.expires_at, claims.exp);
    }

    #[test]
    fn non_admin_claim_round_trips_false() {
        let jwt = test_jwt();
        let issued = jwt.issue_access_token(&account(false)).unwrap();
        assert!(!jwt.validate(&issued.token).unwrap().admin);
    }

    #[test]
    fn refresh_token_has_longer_life() {
        let jwt = test_jwt();
        let access = jwt.issue_access_token(&account(true)).unwrap();
        let refresh = jwt.issue_refresh_token(&account(true)).unwrap();

        let claims = jwt.validate(&refresh.token).unwrap();
        assert!(claims.is_refresh());
        assert!(refresh.expires_at > access.expires_at);
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let other = JwtManager::new(b"different-secret", 3600, 86400);
        let issued = test_jwt().issue_access_token(&account(true)).unwrap();
        assert!(other.validate(&issued.token).is_err());
        assert!(other.validate("not-a-valid-token").is_err());
    }

    #[test]
    fn token_hash_is_deterministic() {
        assert_eq!(JwtManager::hash_token("t"), JwtManager::hash_token("t"));
        assert_ne!(JwtManager::hash_token("t"), JwtManager::hash_token("u"));
    }
}
