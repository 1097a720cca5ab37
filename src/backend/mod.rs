//! Hosted backend access
//!
//! The service owns no storage. Rows, remote procedures, authentication and
//! object storage are reached through the traits below; [`SupabaseClient`]
//! implements all three over the hosted REST endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod supabase;

pub use supabase::SupabaseClient;

/// Errors returned by the hosted backend or the transport in front of it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with an error body.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        details: Option<String>,
        hint: Option<String>,
    },
    /// A single-row read matched nothing.
    #[error("no rows returned")]
    NotFound,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Api { .. } => "api",
            BackendError::NotFound => "not_found",
            BackendError::Network(_) => "network",
            BackendError::Decode(_) => "decode",
        }
    }
}

/// Comparison applied to a column in a row query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq(String),
    In(Vec<String>),
    /// Query modifier passed through verbatim (`order`, `limit`).
    Modifier(String),
}

/// A single column filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq(value.to_string()),
        }
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Self {
            column: column.into(),
            op: FilterOp::In(values.into_iter().map(|v| v.to_string()).collect()),
        }
    }

    /// Sorts by `column`.
    pub fn order(column: &str, descending: bool) -> Self {
        let direction = if descending { "desc" } else { "asc" };
        Self {
            column: "order".to_string(),
            op: FilterOp::Modifier(format!("{column}.{direction}")),
        }
    }

    pub fn limit(limit: usize) -> Self {
        Self {
            column: "limit".to_string(),
            op: FilterOp::Modifier(limit.to_string()),
        }
    }

    /// Renders the filter as a PostgREST query pair, e.g. `("id", "eq.42")`.
    pub fn to_query_pair(&self) -> (String, String) {
        let value = match &self.op {
            FilterOp::Eq(value) => format!("eq.{value}"),
            FilterOp::In(values) => {
                let quoted: Vec<String> = values.iter().map(|v| quote_in_value(v)).collect();
                format!("in.({})", quoted.join(","))
            }
            FilterOp::Modifier(value) => value.clone(),
        };
        (self.column.clone(), value)
    }
}

fn quote_in_value(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Relational rows and remote procedures.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError>;

    /// Exactly one row; zero rows is [`BackendError::NotFound`].
    async fn select_single(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Value, BackendError> {
        self.select(table, columns, filters)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::NotFound)
    }

    /// Inserts one row (object) or many (array) and returns the stored representation.
    async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>, BackendError>;

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, BackendError>;

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, BackendError>;
}

/// Signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// Session issued when an auth code is exchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthSession, BackendError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;

    /// Merges `data` into the user's metadata.
    async fn update_user_metadata(&self, access_token: &str, data: Value)
    -> Result<(), BackendError>;
}

/// Object listed in a storage bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl StoredObject {
    pub fn size(&self) -> Option<u64> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("size"))
            .and_then(Value::as_u64)
    }
}

/// Object to upload into a bucket.
#[derive(Debug, Clone)]
pub struct UploadObject {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub cache_control_secs: u32,
    pub upsert: bool,
}

/// Object storage buckets.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn list(
        &self,
        bucket: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, BackendError>;

    async fn upload(&self, bucket: &str, object: UploadObject) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_filter_renders_postgrest_syntax() {
        let filter = Filter::eq("username", "janebaker");
        assert_eq!(
            filter.to_query_pair(),
            ("username".to_string(), "eq.janebaker".to_string())
        );
    }

    #[test]
    fn in_filter_quotes_reserved_characters() {
        let filter = Filter::is_in("id", ["a1", "b,2"]);
        assert_eq!(filter.to_query_pair().1, "in.(a1,\"b,2\")");
    }

    #[test]
    fn modifiers_render_verbatim() {
        assert_eq!(
            Filter::order("average_rating", true).to_query_pair(),
            ("order".to_string(), "average_rating.desc".to_string())
        );
        assert_eq!(Filter::limit(20).to_query_pair().1, "20");
    }

    #[test]
    fn stored_object_size_reads_metadata() {
        let object = StoredObject {
            name: "cookie.png".to_string(),
            metadata: Some(serde_json::json!({ "size": 2048 })),
        };
        assert_eq!(object.size(), Some(2048));
    }
}
