//! Supabase client
//!
//! Thin `reqwest` wrapper over the PostgREST (`/rest/v1`), GoTrue (`/auth/v1`)
//! and Storage (`/storage/v1`) endpoints of a hosted Supabase project.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{
    AuthProvider, AuthSession, AuthUser, BackendError, Filter, ObjectStorage, RowStore,
    StoredObject, UploadObject,
};
use crate::config::AppConfig;

/// Client for one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    /// Key sent with row, rpc and storage requests.
    service_key: Option<String>,
    /// Key sent as `apikey` with auth requests.
    anon_key: Option<String>,
}

impl SupabaseClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        service_key: Option<String>,
        anon_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
            anon_key,
        }
    }

    /// Builds a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(config.http_timeout()).build()?;
        Ok(Self::new(
            http,
            config.supabase_url.clone(),
            config.supabase_row_key().map(str::to_string),
            config
                .supabase_anon_key
                .clone()
                .or_else(|| config.supabase_service_role_key.clone()),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn with_service_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.service_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    fn with_user_token(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        let request = match &self.anon_key {
            Some(key) => request.header("apikey", key),
            None => request,
        };
        request.bearer_auth(access_token)
    }

    fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
        filters.iter().map(Filter::to_query_pair).collect()
    }

    async fn rows(response: Response) -> Result<Vec<Value>, BackendError> {
        match Self::json(response).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    async fn json(response: Response) -> Result<Value, BackendError> {
        let response = Self::check(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| BackendError::Decode(err.to_string()))
    }

    /// Turns a non-success response into [`BackendError::Api`].
    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = parse_error_body(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %error, "Supabase request failed");
        metrics::counter!("backend_errors_total", "kind" => error.kind()).increment(1);
        Err(error)
    }
}

/// Reads the error shapes used by PostgREST (`message`, `code`, `details`, `hint`),
/// GoTrue (`msg` / `error_description`) and Storage (`error`, `message`).
fn parse_error_body(status: u16, body: &str) -> BackendError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = |key: &str| match parsed.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"))
        .or_else(|| text("error"))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("request failed with status {status}")
            } else {
                body.chars().take(200).collect()
            }
        });

    BackendError::Api {
        status,
        message,
        code: text("code").or_else(|| text("error_code")),
        details: text("details"),
        hint: text("hint"),
    }
}

#[async_trait]
impl RowStore for SupabaseClient {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError> {
        debug!(table, columns, filters = filters.len(), "select");
        let request = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", columns)])
            .query(&Self::filter_pairs(filters));
        let response = self.with_service_key(request).send().await?;
        Self::rows(response).await
    }

    async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>, BackendError> {
        debug!(table, "insert");
        let request = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&rows);
        let response = self.with_service_key(request).send().await?;
        Self::rows(response).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        debug!(table, filters = filters.len(), "update");
        let request = self
            .http
            .patch(self.rest_url(table))
            .query(&Self::filter_pairs(filters))
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.with_service_key(request).send().await?;
        Self::rows(response).await
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, BackendError> {
        debug!(function, "rpc");
        let request = self
            .http
            .post(self.rest_url(&format!("rpc/{function}")))
            .json(&args);
        let response = self.with_service_key(request).send().await?;
        Self::json(response).await
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthSession, BackendError> {
        let mut request = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "pkce")])
            .json(&json!({
                "auth_code": code,
                "code_verifier": code_verifier,
            }));
        if let Some(key) = &self.anon_key {
            request = request.header("apikey", key);
        }
        let response = Self::check(request.send().await?).await?;
        response
            .json::<AuthSession>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let request = self.http.get(format!("{}/auth/v1/user", self.base_url));
        let response = Self::check(self.with_user_token(request, access_token).send().await?)
            .await?;
        response
            .json::<AuthUser>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn update_user_metadata(
        &self,
        access_token: &str,
        data: Value,
    ) -> Result<(), BackendError> {
        let request = self
            .http
            .put(format!("{}/auth/v1/user", self.base_url))
            .json(&json!({ "data": data }));
        Self::check(self.with_user_token(request, access_token).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn list(
        &self,
        bucket: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, BackendError> {
        let request = self
            .http
            .post(format!("{}/storage/v1/object/list/{}", self.base_url, bucket))
            .json(&json!({
                "prefix": "",
                "limit": limit,
                "offset": 0,
                "search": search.unwrap_or_default(),
            }));
        let value = Self::json(self.with_service_key(request).send().await?).await?;
        serde_json::from_value(value).map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn upload(&self, bucket: &str, object: UploadObject) -> Result<(), BackendError> {
        let request = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, bucket, object.name
            ))
            .header("content-type", object.content_type)
            .header(
                "cache-control",
                format!("max-age={}", object.cache_control_secs),
            )
            .header("x-upsert", object.upsert.to_string())
            .body(object.bytes);
        Self::check(self.with_service_key(request).send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postgrest_error_body() {
        let error = parse_error_body(
            400,
            r#"{"code":"22P02","details":null,"hint":"check the id","message":"invalid input syntax for type uuid"}"#,
        );
        match error {
            BackendError::Api {
                status,
                message,
                code,
                details,
                hint,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid input syntax for type uuid");
                assert_eq!(code.as_deref(), Some("22P02"));
                assert_eq!(details, None);
                assert_eq!(hint.as_deref(), Some("check the id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parses_auth_error_body() {
        let error = parse_error_body(401, r#"{"code":401,"msg":"invalid JWT"}"#);
        assert_eq!(error.to_string(), "invalid JWT");
    }

    #[test]
    fn falls_back_to_status_for_empty_body() {
        let error = parse_error_body(503, "");
        assert_eq!(error.to_string(), "request failed with status 503");
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = SupabaseClient::new(Client::new(), "https://demo.supabase.co/", None, None);
        assert_eq!(client.base_url(), "https://demo.supabase.co");
        assert_eq!(
            client.rest_url("profiles"),
            "https://demo.supabase.co/rest/v1/profiles"
        );
    }
}
