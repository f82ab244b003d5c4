//! Demo-user authentication and signed session tokens.
//!
//! There is no user database: accounts come from configuration and a login
//! is an exact email + password match. A successful login is exchanged for an
//! HS256 JWT carried in the `auth-token` cookie; verifying that token is the
//! only authorization check in the system.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use opticontrol_config::{AuthSettings, DemoUserConfig};
use opticontrol_types::{User, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const AUTH_COOKIE_NAME: &str = "auth-token";

#[derive(Clone)]
pub struct DemoUser {
    user: User,
    password: String,
}

impl DemoUser {
    #[must_use]
    pub fn new(user: User, password: impl Into<String>) -> Self {
        Self {
            user,
            password: password.into(),
        }
    }
}

impl fmt::Debug for DemoUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoUser")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl From<&DemoUserConfig> for DemoUser {
    fn from(config: &DemoUserConfig) -> Self {
        Self::new(
            User {
                id: UserId::new(config.id.clone()),
                email: config.email.clone(),
                name: config.name.clone(),
            },
            config.password.clone(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<DemoUser>,
}

impl UserDirectory {
    #[must_use]
    pub fn new(users: Vec<DemoUser>) -> Self {
        Self { users }
    }

    #[must_use]
    pub fn from_config(users: &[DemoUserConfig]) -> Self {
        Self::new(users.iter().map(DemoUser::from).collect())
    }

    /// Exact email and password match.
    #[must_use]
    pub fn authenticate(&self, email: &str, password: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.user.email == email && u.password == password)
            .map(|u| u.user.clone())
    }
}

/// JWT payload. Field names match the cookie tokens the dashboard has
/// always issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub iat: u64,
    pub exp: u64,
}

impl From<Claims> for User {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            name: claims.name,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &"HS256")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.jwt_secret.as_bytes(), settings.token_ttl)
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, user: &User) -> Result<String, AuthError> {
        self.sign_at(user, unix_now())
    }

    /// Sign with an explicit issue time (Unix seconds).
    pub fn sign_at(&self, user: &User, issued_at: u64) -> Result<String, AuthError> {
        let claims = Claims {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::Sign)
    }

    pub fn verify(&self, token: &str) -> Result<User, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| User::from(data.claims))
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e),
            })
    }
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
