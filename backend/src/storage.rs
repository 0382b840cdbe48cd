//! Download storage client.
//!
//! Files live in an external object store. This service never streams
//! bytes; it asks the backend to sign a time-boxed URL and hands that to
//! the client.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Client for the storage HTTP API.
pub struct StorageClient {
    http_client: Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl StorageClient {
    pub fn new(
        base_url: &str,
        bucket: &str,
        service_key: &str,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        })
    }

    /// Sign `file` in the configured bucket for `expires_in` seconds and
    /// return the absolute download URL.
    pub async fn sign_url(&self, file: &str, expires_in: u64) -> Result<String, StorageError> {
        let url = format!("{}/object/sign/{}/{}", self.base_url, self.bucket, file);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({ "expiresIn": expires_in }))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(file.to_string()));
        }
        if status == StatusCode::BAD_REQUEST {
            // The backend reports a missing object key as a 400
            let body = response.text().await.unwrap_or_default();
            if body.to_lowercase().contains("not found") {
                return Err(StorageError::NotFound(file.to_string()));
            }
            return Err(StorageError::Backend(format!("sign returned 400: {}", body)));
        }
        if !status.is_success() {
            return Err(StorageError::Backend(format!("sign returned {}", status)));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(join_signed_url(&self.base_url, &signed.signed_url))
    }
}

/// The backend returns the signed path relative to its own base URL.
fn join_signed_url(base_url: &str, signed: &str) -> String {
    if signed.starts_with("http://") || signed.starts_with("https://") {
        return signed.to_string();
    }
    if signed.starts_with('/') {
        format!("{}{}", base_url, signed)
    } else {
        format!("{}/{}", base_url, signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_signed_url_relative_path() {
        assert_eq!(
            join_signed_url(
                "http://localhost:54321/storage/v1",
                "/object/sign/downloads/guide.pdf?token=abc"
            ),
            "http://localhost:54321/storage/v1/object/sign/downloads/guide.pdf?token=abc"
        );
    }

    #[test]
    fn test_join_signed_url_without_leading_slash() {
        assert_eq!(
            join_signed_url("http://host/storage/v1", "object/sign/x"),
            "http://host/storage/v1/object/sign/x"
        );
    }

    #[test]
    fn test_join_signed_url_absolute_passthrough() {
        assert_eq!(
            join_signed_url("http://host/storage/v1", "https://cdn.example.com/x?sig=1"),
            "https://cdn.example.com/x?sig=1"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = StorageClient::new(
            "http://host/storage/v1/",
            "downloads",
            "svc",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://host/storage/v1");
    }
}
