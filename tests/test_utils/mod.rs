//! Test utilities: in-memory stand-ins for the hosted backend and the
//! language model, recording every call so tests can assert on traffic.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use breaddie::backend::{
    AuthProvider, AuthSession, AuthUser, BackendError, Filter, FilterOp, ObjectStorage, RowStore,
    StoredObject, UploadObject,
};
use breaddie::config::AppConfig;
use breaddie::llm::{CompletionRequest, LanguageModel, LlmError};
use breaddie::server::AppState;
use serde_json::{Value, json};

/// A call made against [`FakeRows`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowCall {
    Select { table: String },
    Insert { table: String, rows: Value },
    Update { table: String, patch: Value },
    Rpc { function: String, args: Value },
}

fn api_error(message: &str) -> BackendError {
    BackendError::Api {
        status: 400,
        message: message.to_string(),
        code: Some("P0001".to_string()),
        details: None,
        hint: None,
    }
}

fn cell_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match &filter.op {
        FilterOp::Eq(value) => cell_text(row, &filter.column).as_deref() == Some(value.as_str()),
        FilterOp::In(values) => {
            cell_text(row, &filter.column).is_some_and(|cell| values.contains(&cell))
        }
        FilterOp::Modifier(_) => true,
    })
}

/// Tables held in memory. Filters are applied; ordering and limits are not.
#[derive(Default)]
pub struct FakeRows {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    rpc_results: Mutex<HashMap<String, Result<Value, String>>>,
    failing_tables: Mutex<HashSet<String>>,
    calls: Mutex<Vec<RowCall>>,
    next_id: Mutex<u64>,
}

impl FakeRows {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn on_rpc(&self, function: &str, result: Value) {
        self.rpc_results
            .lock()
            .unwrap()
            .insert(function.to_string(), Ok(result));
    }

    pub fn fail_rpc(&self, function: &str, message: &str) {
        self.rpc_results
            .lock()
            .unwrap()
            .insert(function.to_string(), Err(message.to_string()));
    }

    /// Makes every write to `table` fail.
    pub fn fail_writes_to(&self, table: &str) {
        self.failing_tables.lock().unwrap().insert(table.to_string());
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RowCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rpc_calls(&self, function: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RowCall::Rpc { function: f, args } if f == function => Some(args),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RowCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_writable(&self, table: &str) -> Result<(), BackendError> {
        if self.failing_tables.lock().unwrap().contains(table) {
            Err(api_error(&format!("insert into {table} rejected")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RowStore for FakeRows {
    async fn select(
        &self,
        table: &str,
        _columns: &str,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError> {
        self.record(RowCall::Select {
            table: table.to_string(),
        });
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|row| matches(row, filters))
            .collect())
    }

    async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>, BackendError> {
        self.record(RowCall::Insert {
            table: table.to_string(),
            rows: rows.clone(),
        });
        self.check_writable(table)?;

        let rows = match rows {
            Value::Array(rows) => rows,
            row => vec![row],
        };
        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            if row.get("id").is_none() {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                row["id"] = json!(format!("{table}-{next_id}"));
            }
            stored.push(row);
        }
        self.seed(table, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        self.record(RowCall::Update {
            table: table.to_string(),
            patch: patch.clone(),
        });
        self.check_writable(table)?;

        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        for row in tables.entry(table.to_string()).or_default() {
            if !matches(row, filters) {
                continue;
            }
            if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, BackendError> {
        self.record(RowCall::Rpc {
            function: function.to_string(),
            args,
        });
        match self.rpc_results.lock().unwrap().get(function) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(api_error(message)),
            None => Ok(Value::Null),
        }
    }
}

/// Sessions keyed by access token; codes exchange into those sessions.
#[derive(Default)]
pub struct FakeAuth {
    users: Mutex<HashMap<String, AuthUser>>,
    codes: Mutex<HashMap<String, String>>,
    metadata_updates: Mutex<Vec<(String, Value)>>,
    fail_metadata: Mutex<bool>,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a signed-in user reachable with `token`.
    pub fn sign_in(&self, token: &str, user_id: &str) {
        self.users.lock().unwrap().insert(
            token.to_string(),
            AuthUser {
                id: user_id.to_string(),
                email: Some(format!("{user_id}@example.com")),
                user_metadata: json!({}),
            },
        );
    }

    pub fn issue_code(&self, code: &str, token: &str) {
        self.codes
            .lock()
            .unwrap()
            .insert(code.to_string(), token.to_string());
    }

    pub fn fail_metadata_updates(&self) {
        *self.fail_metadata.lock().unwrap() = true;
    }

    pub fn metadata_updates(&self) -> Vec<(String, Value)> {
        self.metadata_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        _code_verifier: Option<&str>,
    ) -> Result<AuthSession, BackendError> {
        let token = self
            .codes
            .lock()
            .unwrap()
            .remove(code)
            .ok_or_else(|| api_error("invalid flow state"))?;
        let user = self.get_user(&token).await?;
        Ok(AuthSession {
            access_token: token,
            refresh_token: None,
            expires_in: Some(3600),
            user,
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.users
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| api_error("invalid JWT"))
    }

    async fn update_user_metadata(
        &self,
        access_token: &str,
        data: Value,
    ) -> Result<(), BackendError> {
        self.metadata_updates
            .lock()
            .unwrap()
            .push((access_token.to_string(), data));
        if *self.fail_metadata.lock().unwrap() {
            return Err(api_error("metadata update failed"));
        }
        Ok(())
    }
}

/// Replies with scripted text, in order; records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<Vec<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn replying(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::default(),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(vec![Err(message.to_string())]),
            requests: Mutex::default(),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        replies.remove(0).map_err(|message| LlmError::Api {
            status: 500,
            message,
        })
    }
}

/// Buckets held in memory.
#[derive(Default)]
pub struct FakeStorage {
    buckets: Mutex<HashMap<String, Vec<UploadObject>>>,
    failing_buckets: Mutex<HashSet<String>>,
}

impl FakeStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, bucket: &str, name: &str) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .push(UploadObject {
                name: name.to_string(),
                bytes: Vec::new(),
                content_type: "application/octet-stream".to_string(),
                cache_control_secs: 0,
                upsert: false,
            });
    }

    pub fn fail_uploads_to(&self, bucket: &str) {
        self.failing_buckets.lock().unwrap().insert(bucket.to_string());
    }

    pub fn objects(&self, bucket: &str) -> Vec<UploadObject> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn list(
        &self,
        bucket: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, BackendError> {
        Ok(self
            .objects(bucket)
            .into_iter()
            .filter(|object| search.is_none_or(|s| object.name.contains(s)))
            .take(limit)
            .map(|object| StoredObject {
                metadata: Some(json!({ "size": object.bytes.len() })),
                name: object.name,
            })
            .collect())
    }

    async fn upload(&self, bucket: &str, object: UploadObject) -> Result<(), BackendError> {
        if self.failing_buckets.lock().unwrap().contains(bucket) {
            return Err(api_error("bucket not found"));
        }
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets.entry(bucket.to_string()).or_default();
        objects.retain(|existing| existing.name != object.name);
        objects.push(object);
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        site_url: Some("https://breaddie.test".to_string()),
        supabase_url: "https://abc.supabase.co".to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(rows: Arc<FakeRows>, auth: Arc<FakeAuth>, llm: Arc<ScriptedModel>) -> AppState {
    AppState {
        config: Arc::new(test_config()),
        rows,
        auth,
        llm,
    }
}
