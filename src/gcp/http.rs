//! HTTP utilities for GCP REST API calls

use crate::compute::ApiResult;
use crate::error::ApiError;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// `{"error": {"code": 404, "message": "..."}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// The API's own error message when the body carries one, the status
/// reason otherwise
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("gce-igm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get<T: DeserializeOwned>(&self, url: &Url, token: &str) -> ApiResult<T> {
        self.send(self.request(Method::GET, url, token)).await
    }

    /// Make a POST request to a GCP API
    pub async fn post<T, B>(&self, url: &Url, token: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, url, token);
        let request = match body {
            Some(body) => request.json(body),
            // Compute rejects a POST without Content-Length (411)
            None => request.body(Vec::new()),
        };
        self.send(request).await
    }

    /// Make a PATCH request to a GCP API
    pub async fn patch<T, B>(&self, url: &Url, token: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PATCH, url, token).json(body))
            .await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete<T: DeserializeOwned>(&self, url: &Url, token: &str) -> ApiResult<T> {
        self.send(self.request(Method::DELETE, url, token)).await
    }

    fn request(&self, method: Method, url: &Url, token: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.client
            .request(method, url.clone())
            .bearer_auth(token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::debug!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::status(status, error_message(status, &body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!("Undecodable response: {}", sanitize_for_log(&body));
            ApiError::decode(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        let body = r#"{"error":{"code":404,"message":"The resource 'x' was not found","errors":[]}}"#;
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, body),
            "The resource 'x' was not found"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "<html>"), "Bad Gateway");
    }
}
