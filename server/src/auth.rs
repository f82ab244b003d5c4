//! Cookie handling and the request-level authentication check.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use opticontrol_core::AUTH_COOKIE_NAME;
use opticontrol_types::User;

use crate::error::ApiError;
use crate::state::{AppState, SharedState};

/// A request carrying a valid `auth-token` cookie.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = token_from(&jar).ok_or(ApiError::Unauthorized)?;
        let user = state.signer.verify(token).map_err(|e| {
            tracing::debug!(path = %parts.uri.path(), "Rejected auth token: {e}");
            ApiError::from(e)
        })?;
        Ok(Self(user))
    }
}

fn token_from(jar: &CookieJar) -> Option<&str> {
    jar.get(AUTH_COOKIE_NAME)
        .map(Cookie::value)
        .filter(|token| !token.is_empty())
}

/// The signed-in user, if the jar holds a valid token.
#[must_use]
pub fn current_user(jar: &CookieJar, state: &AppState) -> Option<User> {
    state.signer.verify(token_from(jar)?).ok()
}

#[must_use]
pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((AUTH_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Cookie matching [`session_cookie`]'s name and path, for removal.
#[must_use]
pub fn cleared_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, "")).path("/").build()
}
