//! Session resolution for signed-in users.
//!
//! A request is signed in when it carries the user's access token, either as
//! `Authorization: Bearer <token>` or in the `sb-access-token` cookie. The
//! token is resolved to a user by the auth service on every request.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, header::COOKIE, request::Parts},
};
use tracing::debug;

use crate::backend::{AuthProvider, AuthUser};
use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};
use crate::server::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

impl FromRef<AppState> for Arc<dyn AuthProvider> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.auth)
    }
}

/// Reads a cookie by name from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Access token from the bearer header, falling back to the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| cookie_value(headers, ACCESS_TOKEN_COOKIE))
}

/// The signed-in user. Rejects with 401 when the request has no valid session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    pub access_token: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

async fn resolve(parts: &Parts, auth: &dyn AuthProvider) -> Option<CurrentUser> {
    let token = access_token(&parts.headers)?;
    match auth.get_user(&token).await {
        Ok(user) => Some(CurrentUser {
            user,
            access_token: token,
        }),
        Err(err) => {
            debug!(error = %err, "Session token rejected");
            None
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<dyn AuthProvider>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<dyn AuthProvider>::from_ref(state);
        resolve(parts, auth.as_ref())
            .await
            .ok_or_else(|| unauthorized(Some("Sign in required")))
    }
}

/// The signed-in user when there is one; never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<dyn AuthProvider>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<dyn AuthProvider>::from_ref(state);
        Ok(MaybeUser(resolve(parts, auth.as_ref()).await))
    }
}
