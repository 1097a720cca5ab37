//! # Auth Callback Handler
//!
//! Completes email and OAuth sign-in: the auth service redirects here with a
//! one-time code, which is exchanged for a session before the user is sent on.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;
use utoipa::IntoParams;

use crate::auth::cookie_value;
use crate::server::AppState;
use crate::urls::site_url;

pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

const ERROR_PATH: &str = "/auth/auth-code-error";
const ERROR_TITLE: &str = "Hmm... Something went wrong.";
const ERROR_MESSAGE: &str = "Sorry, we could not authenticate you. Please try again.";
const SUCCESS_TITLE: &str = "Success!";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// One-time code issued by the auth service
    pub code: Option<String>,
    /// Site path to continue to, defaults to `/`
    pub next: Option<String>,
    /// Flow that issued the code (signup, email_change, invite, magiclink, recovery)
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Toast message shown after a successful exchange.
pub fn success_message(kind: Option<&str>) -> &'static str {
    match kind {
        Some("signup") => "Your email has been confirmed! You can now access your account.",
        Some("email_change") => "Your email address has been successfully updated.",
        Some("invite") => "Welcome to breaddie! Your invitation has been accepted.",
        Some("magiclink") => "You have been signed in successfully via magic link.",
        Some("recovery") => "You can now reset your password.",
        _ => "You have been successfully authenticated.",
    }
}

/// Origin the request was addressed to, falling back to the configured site.
fn request_origin(headers: &HeaderMap, state: &AppState) -> String {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty());
    match host {
        Some(host) => {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("http");
            format!("{scheme}://{host}")
        }
        None => site_url(&state.config, ""),
    }
}

/// Only site-relative paths are accepted as a continuation target.
fn next_path(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

fn with_toast(target: &str, pairs: [(&str, &str); 2]) -> String {
    match Url::parse(target) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(pairs);
            url.to_string()
        }
        Err(_) => target.to_string(),
    }
}

/// Exchange an auth code for a session
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackParams),
    responses(
        (status = 307, description = "Redirect to the continuation path or the auth error page")
    ),
    tag = "auth"
)]
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Redirect {
    let origin = request_origin(&headers, &state);

    if let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) {
        let verifier = cookie_value(&headers, CODE_VERIFIER_COOKIE);
        match state
            .auth
            .exchange_code_for_session(code, verifier.as_deref())
            .await
        {
            Ok(session) => {
                let next = next_path(params.next.as_deref());
                let forwarded_host = headers
                    .get("x-forwarded-host")
                    .and_then(|v| v.to_str().ok())
                    .filter(|h| !h.is_empty());
                let target = match forwarded_host {
                    Some(host) if !state.config.is_development() => {
                        format!("https://{host}{next}")
                    }
                    _ => format!("{origin}{next}"),
                };
                info!(user_id = %session.user.id, kind = ?params.kind, "Auth code exchanged");
                return Redirect::temporary(&with_toast(
                    &target,
                    [
                        ("status", SUCCESS_TITLE),
                        ("status_description", success_message(params.kind.as_deref())),
                    ],
                ));
            }
            Err(err) => warn!(error = %err, "Auth code exchange failed"),
        }
    } else {
        warn!("Auth callback called without a code");
    }

    Redirect::temporary(&with_toast(
        &format!("{origin}{ERROR_PATH}"),
        [("error", ERROR_TITLE), ("error_description", ERROR_MESSAGE)],
    ))
}
