//! HTTP utilities for CloudSigma REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
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

/// HTTP client wrapper authenticating every call with basic auth
#[derive(Clone)]
pub struct CsHttpClient {
    client: Client,
    username: String,
    password: String,
}

impl CsHttpClient {
    /// Create a new HTTP client
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cscli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!("GET {}", url);
        let response = self
            .request(Method::GET, url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;
        read_json(response).await
    }

    /// Make a POST request with an optional JSON body
    pub async fn post(&self, url: &str, query: &[(&str, &str)], body: Option<&Value>) -> Result<Value> {
        tracing::debug!("POST {}", url);
        let mut request = self.request(Method::POST, url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.context("Failed to send request")?;
        read_json(response).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", url);
        let response = self
            .request(Method::PUT, url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;
        read_json(response).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        let response = self
            .request(Method::DELETE, url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;
        read_json(response).await
    }

    /// POST a raw binary body, returning the response text
    pub async fn post_octets(&self, url: &str, body: Vec<u8>) -> Result<String> {
        tracing::debug!("POST {} ({} bytes)", url, body.len());
        let response = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .context("Failed to send upload")?;
        let text = read_text(response).await?;
        Ok(text.trim().to_string())
    }
}

async fn read_text(response: Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    if !status.is_success() {
        tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        return Err(anyhow::anyhow!(
            "API request failed: {} {}",
            status,
            api_error_message(&body).unwrap_or_default()
        ));
    }

    Ok(body)
}

async fn read_json(response: Response) -> Result<Value> {
    let body = read_text(response).await?;

    // Handle empty response
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).context("Failed to parse response JSON")
}

/// Pull the human-readable message out of a CloudSigma error body
///
/// Errors come back as `[{"error_type": ..., "error_message": ..., "error_point": ...}]`.
fn api_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let first = match &parsed {
        Value::Array(items) => items.first()?,
        other => other,
    };
    first
        .get("error_message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("bad\r\nrequest"), "badrequest");
    }

    #[test]
    fn test_api_error_message_from_error_list() {
        let body = r#"[{"error_point": null, "error_type": "permission", "error_message": "Authentication failed"}]"#;
        assert_eq!(
            api_error_message(body).as_deref(),
            Some("Authentication failed")
        );
        assert_eq!(api_error_message("<html>"), None);
    }
}
