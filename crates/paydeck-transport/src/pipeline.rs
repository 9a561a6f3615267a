//! Single-request execution with outcome classification
//!
//! `Transport` owns the shared HTTP client and base URL. Each call builds
//! `{base_url}{path}`, attaches the bearer credential if the source yields
//! one (absence is not an error — some endpoints are unauthenticated), and
//! classifies the result per `RequestError`. Classification order is fixed:
//! transport, then status, then body shape, then embedded error field.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{RequestError, Result};

/// Source of the current bearer credential.
///
/// The seam between the pipeline and credential storage: the pipeline reads
/// through this trait at request time and never caches or mutates the token.
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn CredentialSource>`), so stores and in-memory test fakes plug in
/// interchangeably.
pub trait CredentialSource: Send + Sync {
    /// The token to attach as `Authorization: Bearer`, or None to send the
    /// request unauthenticated.
    fn bearer(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>>;
}

/// Credential source for unauthenticated use — never yields a token.
pub struct Anonymous;

impl CredentialSource for Anonymous {
    fn bearer(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(async { None })
    }
}

/// Executes requests against one API host.
///
/// Cheap to share behind `Arc`; the inner `reqwest::Client` pools
/// connections internally.
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    credentials: Arc<dyn CredentialSource>,
}

impl Transport {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
            credentials,
        }
    }

    /// Execute one request and classify the outcome.
    ///
    /// Every request is bounded by the configured timeout; expiry surfaces
    /// as `Transport`, the same as any other failure to obtain a response.
    pub async fn execute<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let request_id = format!("req_{}", Uuid::new_v4().as_simple());
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!(request_id, method = %method, path, "executing request");

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .timeout(self.timeout);
        if let Some(token) = self.credentials.bearer().await {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(request_id, path, error = %e, "no response from server");
                record_outcome(&method, "transport");
                return Err(RequestError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(request_id, path, status = status.as_u16(), "non-success status");
            record_outcome(&method, "protocol");
            return Err(RequestError::Protocol(status.as_u16()));
        }

        // The response started arriving; a read failure here is still a
        // transport-level interruption, not a malformed payload.
        let text = response
            .text()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!(request_id, path, error = %e, "unparseable response body");
                record_outcome(&method, "decode");
                return Err(RequestError::Decode(e.to_string()));
            }
        };

        if let Some(code) = embedded_error(&value) {
            debug!(request_id, path, code, "server reported application error");
            record_outcome(&method, "application");
            return Err(RequestError::Application(code));
        }

        record_outcome(&method, "success");
        Ok(value)
    }

    /// `GET {base_url}{path}` with no body.
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.execute::<Value>(Method::GET, path, None).await
    }

    /// `POST {base_url}{path}` with a JSON body.
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        self.execute(Method::POST, path, Some(body)).await
    }
}

/// An otherwise-successful body carrying an `error` field is a first-class
/// failure. String codes pass through as-is; structured errors are
/// serialized so the caller still sees the full server message.
fn embedded_error(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(
        error
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string()),
    )
}

fn record_outcome(method: &Method, outcome: &'static str) {
    metrics::counter!(
        "sdk_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Deserialize a pipeline result into a typed value.
///
/// A shape mismatch on a 2xx body is the server misbehaving, so it maps to
/// `Decode` like any other unparseable payload.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| RequestError::Decode(e.to_string()))
}
