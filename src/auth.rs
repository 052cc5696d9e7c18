use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::User,
};

const TOKEN_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user ID
    pub username: String,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

impl Claims {
    pub fn new(user: &User) -> Self {
        let now = Utc::now();
        let exp = now + Duration::days(TOKEN_LIFETIME_DAYS);

        Self {
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn user_id(&self) -> AppResult<Uuid> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }
}

/// Issues and checks session tokens and password hashes
///
/// Tokens are stateless HS256 JWTs, so logging out is a matter of the
/// client discarding its token.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(secret: &str, bcrypt_cost: u32) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            bcrypt_cost,
        }
    }

    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let claims = Claims::new(user);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Unauthorized("Invalid token".to_string())
            })
    }

    /// Hashes a password on the blocking pool
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Checks a password against its hash on the blocking pool
    pub async fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
    }
}

/// The authenticated user; rejects the request with 401 otherwise
#[derive(Debug)]
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Missing authorization token".to_string()))?;

        let claims = state.auth.verify_token(bearer.token())?;
        let user = state
            .repo
            .find_user_by_id(claims.user_id()?)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        Ok(AuthUser(user))
    }
}

/// The user if a valid token was sent
///
/// A missing or invalid token yields an anonymous visitor rather than an error.
#[derive(Debug)]
pub struct MaybeUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(AuthUser(user)) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized(_)) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: None,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let auth = AuthService::new("secret", 4);
        let alice = user();

        let token = auth.generate_token(&alice).unwrap();
        let claims = auth.verify_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), alice.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = AuthService::new("secret", 4).generate_token(&user()).unwrap();
        let result = AuthService::new("other", 4).verify_token(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AuthService::new("secret", 4);
        let past = Utc::now() - Duration::days(8);
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "alice".to_string(),
            exp: (past + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
            iat: past.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &auth.encoding_key).unwrap();

        assert!(auth.verify_token(&token).is_err());
    }

    #[tokio::test]
    async fn test_password_hashing() {
        let auth = AuthService::new("secret", 4);
        let hash = auth.hash_password("correct horse").await.unwrap();

        assert_ne!(hash, "correct horse");
        assert!(auth.verify_password("correct horse", &hash).await.unwrap());
        assert!(!auth.verify_password("battery staple", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashing_leaves_runtime_responsive() {
        // cost 12 keeps a thread busy for hundreds of milliseconds
        let auth = AuthService::new("secret", 12);

        let ticker = tokio::spawn(async {
            let mut worst = std::time::Duration::ZERO;
            for _ in 0..20 {
                let start = std::time::Instant::now();
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                worst = worst.max(start.elapsed());
            }
            worst
        });
        tokio::task::yield_now().await;

        let hash = auth.hash_password("correct horse").await.unwrap();
        assert!(hash.starts_with("$2b$12$"));

        let worst = ticker.await.unwrap();
        assert!(
            worst < std::time::Duration::from_millis(250),
            "runtime stalled for {:?}",
            worst
        );
    }
}
