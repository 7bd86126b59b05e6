//! Credential verification and bearer token issuance.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("invalid user input: {0}")]
    Validation(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// JWT payload. `sub` carries the user id as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// The identity a verified token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

/// Returns `false` for a mismatch; a malformed stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|err| AuthError::Hash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// HS256 signer and verifier sharing one secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &UserRecord) -> Result<String, AuthError> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user: &UserRecord, now: OffsetDateTime) -> Result<String, AuthError> {
        let iat = now.unix_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| AuthError::Signing("token ttl out of range".to_string()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            debug!(target = "scribe::auth", error = %err, "token rejected");
            AuthError::InvalidToken
        })?;

        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthenticatedUser {
            user_id,
            username: data.claims.username,
        })
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    /// Unknown users and wrong passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            debug!(target = "scribe::auth", "unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let stored_hash = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
                .await
                .map_err(|err| AuthError::Hash(err.to_string()))??;

        if !matches {
            debug!(target = "scribe::auth", user_id = user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.tokens.issue(&user)
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.tokens.verify(token)
    }

    pub fn token_ttl(&self) -> Duration {
        self.tokens.ttl()
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("username must not be empty".into()));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AuthError::Validation(format!(
                "username must be at most {MAX_USERNAME_LEN} characters"
            )));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password must not be empty".into()));
        }

        let owned = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&owned))
            .await
            .map_err(|err| AuthError::Hash(err.to_string()))??;

        let user = self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AuthError::UsernameTaken(username.to_string()),
                other => AuthError::Repo(other),
            })?;

        info!(target = "scribe::auth", user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryRepositories;

    const SECRET: &str = "test-secret";

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryRepositories::new()),
            TokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL),
        )
    }

    fn alice() -> UserRecord {
        UserRecord {
            id: 7,
            username: "alice".into(),
            password_hash: String::new(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash).expect("verify"));
        assert!(!verify_password("hunter3", &hash).expect("verify"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AuthError::Hash(_))
        ));
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = TokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL);
        let token = issuer.issue(&alice()).expect("issue");
        let user = issuer.verify(&token).expect("verify");
        assert_eq!(
            user,
            AuthenticatedUser {
                user_id: 7,
                username: "alice".into()
            }
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(SECRET, Duration::from_secs(60));
        let issued_at = OffsetDateTime::now_utc() - time::Duration::hours(2);
        let token = issuer.issue_at(&alice(), issued_at).expect("issue");
        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenIssuer::new("other", DEFAULT_TOKEN_TTL)
            .issue(&alice())
            .expect("issue");
        let issuer = TokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL);
        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(
            issuer.verify("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn authenticate_accepts_only_correct_password() {
        let service = service();
        service.create_user("alice", "s3cret").await.expect("create");

        assert!(matches!(
            service.authenticate("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("bob", "s3cret").await,
            Err(AuthError::InvalidCredentials)
        ));

        let token = service.authenticate("alice", "s3cret").await.expect("token");
        let user = service.verify_token(&token).expect("verify");
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let service = service();
        service.create_user("alice", "one").await.expect("create");
        assert!(matches!(
            service.create_user("alice", "two").await,
            Err(AuthError::UsernameTaken(name)) if name == "alice"
        ));
        assert!(matches!(
            service.create_user("  ", "pw").await,
            Err(AuthError::Validation(_))
        ));
    }
}
