//! Adapter for the hosted backend: auth under `/auth/v1`, tables under
//! `/rest/v1`, objects under `/storage/v1`.

mod auth;
mod data;
pub mod query;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use agrilink_types::api::Session;

use crate::error::{BackendError, BackendResult};
use crate::persist::SessionPersistence;

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    /// Public (anon) project key, sent on every request.
    pub anon_key: String,
    pub timeout: Duration,
}

pub struct RestBackend {
    http: Client,
    config: RestConfig,
    session: RwLock<Option<Session>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl RestBackend {
    pub fn new(config: RestConfig, persistence: Arc<dyn SessionPersistence>) -> BackendResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            session: RwLock::new(None),
            persistence,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// A request carrying the project key and the caller's token (the anon key when signed out).
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = match self.session.read().await.as_ref() {
            Some(s) => s.access_token.clone(),
            None => self.config.anon_key.clone(),
        };
        debug!("{} {}", method, path);
        self.http
            .request(method, self.url(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    async fn table(&self, method: Method, table: &str, query: &query::Query) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{}", table))
            .await
            .query(query.pairs())
    }
}

/// Pass successful responses through; turn anything else into a [`BackendError`].
async fn check(resp: Response) -> BackendResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), &body))
}

async fn read<T: DeserializeOwned>(resp: Response) -> BackendResult<T> {
    let resp = check(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Single row out of a `return=representation` array.
async fn read_one<T: DeserializeOwned>(resp: Response, entity: &'static str) -> BackendResult<Option<T>> {
    let rows: Vec<T> = read(resp).await?;
    if rows.len() > 1 {
        warn!("Expected one {} row, got {}", entity, rows.len());
    }
    Ok(rows.into_iter().next())
}

/// Map an error response body onto the backend taxonomy.
pub(crate) fn classify(status: u16, body: &str) -> BackendError {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    if json.get("code").and_then(Value::as_str) == Some(UNIQUE_VIOLATION) {
        return BackendError::UniqueViolation(error_message(&json, body));
    }

    let message = error_message(&json, body);
    match status {
        401 | 403 => BackendError::Unauthorized(message),
        _ => BackendError::Rejected { status, message },
    }
}

/// The human-readable part of an error body. The three services disagree on the field name.
fn error_message(json: &Value, raw: &str) -> String {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|k| json.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if raw.trim().is_empty() {
                "request failed".to_string()
            } else {
                raw.trim().to_string()
            }
        })
}

/// Total from a `Content-Range` header such as `0-24/57` or `*/0`.
fn content_range_total(header: &str) -> Option<i64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_recognised_by_code() {
        let body = r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value violates unique constraint \"applications_job_id_worker_id_key\""}"#;
        assert!(matches!(classify(409, body), BackendError::UniqueViolation(m) if m.contains("duplicate key")));
    }

    #[test]
    fn message_field_varies_by_service() {
        match classify(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#) {
            BackendError::Rejected { status: 400, message } => assert_eq!(message, "Invalid login credentials"),
            other => panic!("unexpected: {:?}", other),
        }
        match classify(422, r#"{"code":422,"msg":"User already registered"}"#) {
            BackendError::Rejected { message, .. } => assert_eq!(message, "User already registered"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(classify(401, r#"{"message":"JWT expired"}"#), BackendError::Unauthorized(m) if m == "JWT expired"));
        assert!(matches!(classify(502, "Bad Gateway"), BackendError::Rejected { status: 502, message } if message == "Bad Gateway"));
    }

    #[test]
    fn parses_content_range() {
        assert_eq!(content_range_total("0-24/57"), Some(57));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
    }
}
