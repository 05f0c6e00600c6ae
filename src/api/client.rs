//! CineMate REST client
//!
//! Single point of outbound HTTP. Every request carries the stored bearer
//! token, a 401 triggers one refresh-and-retry cycle, and every outcome is
//! normalized into [`ApiResponse`] or [`ApiError`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{
    codes, format_details, ApiError, ApiResponse, ApiResult, ErrorBody, RefreshPayload,
    DEFAULT_SUCCESS_MESSAGE,
};
use crate::storage::{CredentialStore, KeyValueStore};

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://api.cinemate.app/api/v1";
/// Value of the `x-platform` header unless configured otherwise
pub const DEFAULT_PLATFORM: &str = "mobile";
/// Per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Endpoint that exchanges the refresh cookie for a new session
pub const REFRESH_ENDPOINT: &str = "/auth/refresh-token";

const PLATFORM_HEADER: &str = "x-platform";

/// Invoked when a token refresh fails and the session must be torn down
#[async_trait]
pub trait SessionExpiryHandler: Send + Sync {
    async fn session_expired(&self);
}

/// Connection settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub platform: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One outbound call: method, path relative to the base URL, body and query
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            params: Vec::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::with_code("Could not encode request", codes::INVALID_RESPONSE, e.to_string())
        })?;
        Ok(self.body(value))
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }
}

/// A request on its way through the refresh-retry path
#[derive(Debug, Clone, Copy)]
struct Attempt<'a> {
    request: &'a ApiRequest,
    retried: bool,
}

impl<'a> Attempt<'a> {
    fn first(request: &'a ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    fn retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }

    /// A 401 may be recovered once, and never for the refresh call itself
    fn may_refresh(&self, status: StatusCode) -> bool {
        status == StatusCode::UNAUTHORIZED
            && !self.retried
            && self.request.endpoint != REFRESH_ENDPOINT
    }
}

/// Decoded response body
#[derive(Debug)]
enum Body {
    Empty,
    Json(Value),
    Malformed(String),
}

#[derive(Debug)]
struct RawResponse {
    status: StatusCode,
    body: Body,
}

// =============================================================================
// Client
// =============================================================================

/// Authenticated CineMate API client
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    credentials: CredentialStore,
    expiry: Option<Arc<dyn SessionExpiryHandler>>,
}

impl ApiClient {
    /// Create a client against the production API
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_options(ClientOptions::default(), store)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_options(
            ClientOptions {
                base_url: base_url.into(),
                ..ClientOptions::default()
            },
            store,
        )
    }

    pub fn with_options(options: ClientOptions, store: Arc<dyn KeyValueStore>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let platform = HeaderValue::from_str(&options.platform)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_PLATFORM));
        headers.insert(PLATFORM_HEADER, platform);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .cookie_store(true)
            .build()
            .unwrap_or_default();

        Self {
            base_url: options.base_url.trim_end_matches('/').to_string(),
            http,
            credentials: CredentialStore::new(store),
            expiry: None,
        }
    }

    /// Register the session teardown hook run when refresh fails
    pub fn with_expiry_handler(mut self, handler: Arc<dyn SessionExpiryHandler>) -> Self {
        self.expiry = Some(handler);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Issue `request` and normalize the outcome
    ///
    /// `fallback` is the message reported when the server gives none
    /// (transport failures, empty error bodies).
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self.execute(&request, fallback).await?;
        normalize(response, fallback)
    }

    async fn execute(&self, request: &ApiRequest, fallback: &str) -> Result<RawResponse, ApiError> {
        let mut attempt = Attempt::first(request);

        loop {
            let response = self
                .send(attempt.request)
                .await
                .map_err(|e| transport_error(&e, fallback))?;

            if attempt.may_refresh(response.status) {
                tracing::info!(endpoint = %request.endpoint, "Unauthorized, refreshing session");
                if self.refresh().await {
                    attempt = attempt.retry();
                    continue;
                }
                self.expire_session().await;
            }

            return Ok(response);
        }
    }

    /// Call the refresh endpoint once; true when the session was renewed
    async fn refresh(&self) -> bool {
        let response = match self.send(&ApiRequest::post(REFRESH_ENDPOINT)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed to send");
                return false;
            }
        };

        match normalize::<RefreshPayload>(response, "Session refresh failed") {
            Ok(renewed) => {
                if let Some(token) = renewed.data.access_token {
                    if let Err(e) = self.credentials.set_token(&token).await {
                        tracing::warn!(error = %e, "Could not persist refreshed token");
                    }
                }
                tracing::info!("Session refreshed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh rejected");
                false
            }
        }
    }

    async fn expire_session(&self) {
        if let Err(e) = self.credentials.remove_token().await {
            tracing::warn!(error = %e, "Could not delete expired token");
        }
        if let Some(handler) = &self.expiry {
            handler.session_expired().await;
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, reqwest::Error> {
        let token = self.credentials.token().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read stored token");
            None
        });

        tracing::debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            authenticated = token.is_some(),
            "Sending request"
        );

        let url = format!("{}{}", self.base_url, request.endpoint);
        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Body::Empty
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(value) => Body::Json(value),
                Err(e) => Body::Malformed(e.to_string()),
            }
        };

        tracing::debug!(status = status.as_u16(), endpoint = %request.endpoint, "Received response");
        Ok(RawResponse { status, body })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("expiry_handler", &self.expiry.is_some())
            .finish()
    }
}

// =============================================================================
// Normalization
// =============================================================================

fn normalize<T: DeserializeOwned>(response: RawResponse, fallback: &str) -> ApiResult<T> {
    let RawResponse { status, body } = response;

    if !status.is_success() {
        return Err(match body {
            Body::Json(value) => error_from_body(&value, fallback),
            _ => ApiError::with_code(fallback, &format!("HTTP_{}", status.as_u16()), status.to_string()),
        });
    }

    let value = match body {
        Body::Empty => Value::Object(Default::default()),
        Body::Json(value) => value,
        Body::Malformed(e) => {
            return Err(ApiError::with_code(fallback, codes::INVALID_RESPONSE, e));
        }
    };

    if value.get("success") == Some(&Value::Bool(false)) {
        return Err(error_from_body(&value, fallback));
    }

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SUCCESS_MESSAGE)
        .to_string();
    let data = match value.get("data") {
        Some(Value::Null) | None => Value::Object(Default::default()),
        Some(data) => data.clone(),
    };

    let data = serde_json::from_value(data)
        .map_err(|e| ApiError::with_code(fallback, codes::INVALID_RESPONSE, e.to_string()))?;
    Ok(ApiResponse::new(message, data))
}

/// Build the error shape from a `{success: false, ...}` body
fn error_from_body(value: &Value, fallback: &str) -> ApiError {
    let error: Option<ErrorBody> = value
        .get("error")
        .filter(|e| e.is_object())
        .and_then(|e| serde_json::from_value(e.clone()).ok());

    let details = error
        .as_ref()
        .and_then(|e| e.details.as_ref())
        .filter(|d| !d.is_empty());

    let message = match details {
        Some(details) => format_details(details),
        None => value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| error.as_ref().and_then(|e| e.message.clone()))
            .unwrap_or_else(|| fallback.to_string()),
    };

    ApiError {
        error,
        ..ApiError::new(message)
    }
}

fn transport_error(e: &reqwest::Error, fallback: &str) -> ApiError {
    let code = if e.is_timeout() {
        codes::TIMEOUT
    } else {
        codes::NETWORK_ERROR
    };
    tracing::warn!(error = %e, code, "Request failed without a response");
    ApiError::with_code(fallback, code, e.to_string())
}
