//! HTTP invocation of cataloged operations.
//!
//! Builds real requests from an endpoint's path template and the
//! caller's parameters, applies the API's auth settings, and converts
//! every transport failure into a typed result instead of an error.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use wayfinder_registry::{ApiConfig, AuthType};

/// Deadline for one upstream request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// One request against a cataloged operation.
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    /// Path template (e.g. "/pets/{petId}").
    pub path: String,
    pub method: String,
    /// Path and query parameters together; path placeholders claim
    /// theirs first, the rest go on the query string.
    pub params: BTreeMap<String, Value>,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    /// Truncate list responses to this many items.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Outcome of one invocation. Transport failures land here too, with
/// `status_code = 0` and a message in `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub status_code: u16,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    pub truncated: bool,
    pub auth_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    fn failure(message: impl Into<String>) -> Self {
        ExecutionResult {
            status_code: 0,
            data: Value::Null,
            total_count: None,
            truncated: false,
            auth_error: false,
            error: Some(message.into()),
        }
    }
}

/// Async invoker bound to one API's base URL and auth settings.
pub struct Executor {
    config: ApiConfig,
    base_url: String,
    client: reqwest::Client,
}

impl Executor {
    pub fn new(config: ApiConfig) -> Result<Self, ExecutorError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ExecutorError::Client)?;
        Ok(Executor {
            config,
            base_url,
            client,
        })
    }

    pub async fn execute(&self, request: &CallRequest) -> ExecutionResult {
        let method = match reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                return ExecutionResult::failure(format!(
                    "invalid HTTP method '{}'",
                    request.method
                ))
            }
        };

        let url = self.build_url(&request.path, &request.params);
        let mut query = self.query_params(&request.path, &request.params);
        if let Some(limit) = request.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = request.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }

        let auth = &self.config.auth;
        if auth.auth_type == AuthType::ApiKey && auth.api_key_in == "query" {
            query.push((
                auth.header_name.clone(),
                auth.token.clone().unwrap_or_default(),
            ));
        }

        let mut builder = self.client.request(method, &url);
        for (name, value) in self.build_headers() {
            builder = builder.header(name, value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(url = %url, method = %request.method, "executing request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return ExecutionResult::failure("Request timed out"),
            Err(e) if e.is_connect() => {
                return ExecutionResult::failure(format!(
                    "Connection error: could not connect to {}",
                    self.base_url
                ))
            }
            Err(e) => return ExecutionResult::failure(format!("Request failed: {e}")),
        };

        let status_code = response.status().as_u16();
        let auth_error = status_code == 401 || status_code == 403;

        let text = response.text().await.unwrap_or_default();
        let mut data: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) => Value::String(text),
        };

        let mut truncated = false;
        let mut total_count = None;
        if let (Value::Array(items), Some(limit)) = (&mut data, request.limit) {
            total_count = Some(items.len());
            if items.len() > limit {
                items.truncate(limit);
                truncated = true;
            }
        }

        let error = if status_code >= 400 {
            Some(extract_error(&data, status_code))
        } else {
            None
        };

        ExecutionResult {
            status_code,
            data,
            total_count,
            truncated,
            auth_error,
            error,
        }
    }

    /// Full URL with `{name}` placeholders substituted from params.
    fn build_url(&self, path: &str, params: &BTreeMap<String, Value>) -> String {
        let mut result = path.to_string();
        for name in path_param_names(path) {
            if let Some(value) = params.get(&name) {
                result = result.replace(&format!("{{{name}}}"), &plain_string(value));
            }
        }
        format!("{}{}", self.base_url, result)
    }

    /// Params that did not match a path placeholder.
    fn query_params(&self, path: &str, params: &BTreeMap<String, Value>) -> Vec<(String, String)> {
        let path_names: BTreeSet<String> = path_param_names(path).into_iter().collect();
        params
            .iter()
            .filter(|(name, _)| !path_names.contains(*name))
            .map(|(name, value)| (name.clone(), plain_string(value)))
            .collect()
    }

    fn build_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        let auth = &self.config.auth;
        let token = auth.token.clone().unwrap_or_default();

        match auth.auth_type {
            AuthType::Bearer => {
                headers.insert(auth.header_name.clone(), format!("Bearer {token}"));
            }
            AuthType::ApiKey => {
                if auth.api_key_in == "header" {
                    headers.insert(auth.header_name.clone(), token);
                }
                // query variant handled when the query string is built
            }
            AuthType::Basic => {
                // Token is "username:password"
                headers.insert(
                    auth.header_name.clone(),
                    format!("Basic {}", BASE64.encode(token)),
                );
            }
            AuthType::None => {}
        }

        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }
}

/// Placeholder names in a path template, in order.
fn path_param_names(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        rest = &rest[start + 1..];
        let Some(end) = rest.find('}') else { break };
        names.push(rest[..end].to_string());
        rest = &rest[end + 1..];
    }
    names
}

/// Render a JSON value for a URL: strings unquoted, everything else in
/// its JSON form.
fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_error(data: &Value, status_code: u16) -> String {
    if let Some(obj) = data.as_object() {
        if let Some(message) = obj
            .get("message")
            .or_else(|| obj.get("detail"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
    }
    if let Some(text) = data.as_str() {
        return text.to_string();
    }
    format!("HTTP {status_code}")
}

/// Summary counters for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Results of a batch, in request order.
#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub results: Vec<ExecutionResult>,
    pub summary: BatchSummary,
}

/// Runs many requests with bounded concurrency, preserving order.
pub struct BatchExecutor<'a> {
    executor: &'a Executor,
    concurrency: usize,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(executor: &'a Executor, concurrency: usize) -> Self {
        BatchExecutor {
            executor,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn execute_batch(&self, requests: &[CallRequest]) -> BatchResult {
        let results: Vec<ExecutionResult> = stream::iter(requests)
            .map(|request| self.executor.execute(request))
            .buffered(self.concurrency)
            .collect()
            .await;

        let succeeded = results
            .iter()
            .filter(|r| r.error.is_none() && (200..300).contains(&r.status_code))
            .count();
        let summary = BatchSummary {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        };

        BatchResult { results, summary }
    }
}
