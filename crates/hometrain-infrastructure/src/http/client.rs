//! Thin JSON client for the training REST API.
//!
//! Every request carries the configured timeout and bearer token. Responses
//! use the `{ "success": bool, "message"?: string, ...payload }` envelope.

use hometrain_core::config::ApiConfig;
use hometrain_core::error::{HomeTrainError, Result};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// HTTP client bound to one API base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Builds a client from the API configuration.
    ///
    /// # Errors
    ///
    /// Returns `HomeTrainError::Config` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| HomeTrainError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::DELETE, path)).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, &body));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                HomeTrainError::transient(format!("Timed out reading response: {e}"))
            } else {
                HomeTrainError::Serialization {
                    format: "JSON".to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        decode_envelope(status, body)
    }
}

/// Unwraps the `{success, message, ...}` envelope into `T`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: Value) -> Result<T> {
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    if !success {
        return Err(HomeTrainError::Remote {
            status: status.as_u16(),
            message: envelope_message(&body).unwrap_or_else(|| "request failed".to_string()),
        });
    }

    Ok(serde_json::from_value(body)?)
}

fn envelope_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Maps transport failures. Connection problems and timeouts are transient.
fn map_send_error(err: reqwest::Error) -> HomeTrainError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        HomeTrainError::transient(format!("Request failed: {err}"))
    } else {
        HomeTrainError::internal(format!("Request failed: {err}"))
    }
}

/// Maps a non-2xx answer onto the error taxonomy.
pub(crate) fn map_http_error(status: StatusCode, body: &str) -> HomeTrainError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| envelope_message(&v))
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HomeTrainError::AuthExpired,
        StatusCode::NOT_FOUND => HomeTrainError::not_found("resource", message),
        StatusCode::CONFLICT => HomeTrainError::conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            HomeTrainError::validation(message)
        }
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            HomeTrainError::transient(format!("{} {}", status.as_u16(), message))
        }
        _ => HomeTrainError::Remote {
            status: status.as_u16(),
            message,
        },
    }
}

/// Runs an idempotent operation, retrying it once on a transient failure.
///
/// Must not be used for operations with side effects that are unsafe to
/// repeat (plan generation, session start, submissions).
pub async fn retry_once<T, F, Fut>(operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match call().await {
        Err(err) if err.is_retryable() => {
            tracing::warn!("[ApiClient] {} failed ({}), retrying once", operation, err);
            call().await
        }
        other => other,
    }
}
