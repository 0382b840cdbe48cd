//! Identity backend client.
//!
//! Sessions are owned by an external GoTrue-style identity service. This
//! module never mints or stores tokens itself: it forwards the caller's
//! bearer token for validation and relays credential operations.

use axum::http::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    #[error("Invalid or expired session token")]
    InvalidToken,
    #[error("Invalid login credentials")]
    InvalidCredentials,
    /// The identity backend rejected the operation with its own message.
    #[error("{0}")]
    Rejected(String),
    #[error("Identity backend error: {0}")]
    Backend(String),
}

/// Identity attached to a validated session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

/// User record as reported by the identity backend.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

/// Session payload returned on sign-in and forwarded to the client as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Successful password sign-in: who it is, plus the session to hand back.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: IdentityUser,
    pub session: Session,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    user: IdentityUser,
}

/// Client for the identity HTTP API.
pub struct IdentityClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    service_role_key: Option<String>,
}

impl IdentityClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        service_role_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            service_role_key: service_role_key.map(String::from),
        })
    }

    fn service_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.api_key)
    }

    /// Validate the request's bearer token and return the session's user.
    pub async fn resolve_session(&self, headers: &HeaderMap) -> Result<SessionUser, AuthError> {
        let token = bearer_token(headers)?;
        let url = format!("{}/user", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Backend(format!(
                "session lookup returned {}",
                status
            )));
        }

        let user: IdentityUser = response
            .json()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        Ok(SessionUser {
            id: user.id,
            email: user.email,
        })
    }

    /// Exchange email/password credentials for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, AuthError> {
        let url = format!("{}/token?grant_type=password", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            tracing::debug!("Identity backend rejected sign-in with {}", status);
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Backend(format!("sign-in returned {}", status)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        Ok(SignIn {
            session: Session {
                access_token: token.access_token,
                token_type: token.token_type,
                expires_in: token.expires_in,
                refresh_token: token.refresh_token,
            },
            user: token.user,
        })
    }

    /// Register a new user. `metadata` is stored on the identity record.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<IdentityUser, AuthError> {
        let url = format!("{}/signup", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(error_message(&body)));
        }
        if !status.is_success() {
            return Err(AuthError::Backend(format!("signup returned {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))
    }

    /// Revoke the session behind `token`.
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let url = format!("{}/logout", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Backend(format!(
                "sign-out returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Delete an identity record. Requires the service role key.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AuthError> {
        let url = format!("{}/admin/users/{}", self.base_url, user_id);

        let response = self
            .http_client
            .delete(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.service_key())
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Backend(format!(
                "user delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Extract the bearer token from an Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AuthError::InvalidFormat);
    }

    Ok(&auth_header[7..])
}

/// Pull a human-readable message out of an identity backend error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| {
                    value
                        .get(key)
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
        })
        .unwrap_or_else(|| "Signup rejected by identity backend".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc123"));
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::InvalidFormat)
        ));
    }

    #[test]
    fn test_bearer_token_extracts_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer tok-123"));
        assert_eq!(bearer_token(&headers).unwrap(), "tok-123");
    }

    #[test]
    fn test_error_message_gotrue_msg_field() {
        let body = r#"{"code":400,"msg":"User already registered"}"#;
        assert_eq!(error_message(body), "User already registered");
    }

    #[test]
    fn test_error_message_error_description_field() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(error_message(body), "Invalid login credentials");
    }

    #[test]
    fn test_error_message_unparseable_body() {
        assert_eq!(
            error_message("<html>bad gateway</html>"),
            "Signup rejected by identity backend"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = IdentityClient::new(
            "http://localhost:9999/auth/v1/",
            "anon",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/auth/v1");
    }

    #[test]
    fn test_service_key_fallback() {
        let client =
            IdentityClient::new("http://x", "anon", None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.service_key(), "anon");

        let client = IdentityClient::new("http://x", "anon", Some("svc"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.service_key(), "svc");
    }
}
