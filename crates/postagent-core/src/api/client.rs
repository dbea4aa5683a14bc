//! API client for the Posting Agent REST API.
//!
//! This module provides the `ApiClient` struct for the credential exchange
//! (`/api/auth/login`, `/api/auth/register`) and for authenticated requests
//! such as `/api/auth/me`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{Credentials, Session, UserProfile};

use super::error::{LOGIN_FAILED_MESSAGE, REGISTRATION_FAILED_MESSAGE};
use super::{ApiError, AuthError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const ME_PATH: &str = "/api/auth/me";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    user: Option<serde_json::Value>,
}

impl TokenResponse {
    fn into_session(self, email: &str) -> Session {
        // A profile we can't read is not worth failing a login over
        let user = self
            .user
            .and_then(|value| serde_json::from_value::<UserProfile>(value).ok());

        Session {
            access_token: self.access_token,
            token_type: self.token_type,
            email: Some(email.to_string()),
            user,
            issued_at: Utc::now(),
        }
    }
}

/// New account details for `POST /api/auth/register`
#[derive(Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Trades credentials for a session.
///
/// The login flow only depends on this trait so tests can swap the network
/// out for a scripted fake.
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;
}

/// API client for the Posting Agent backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl ApiClient {
    /// Create a new API client talking to `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<Arc<str>>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            token: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in with email and password.
    ///
    /// Sends exactly one request. No retries.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        debug!(email = %credentials.email, "Sending login request");
        let token = self
            .exchange(LOGIN_PATH, credentials, LOGIN_FAILED_MESSAGE)
            .await?;
        info!(email = %credentials.email, "Login accepted");
        Ok(token.into_session(&credentials.email))
    }

    /// Create an account; the server logs the new user in straight away.
    pub async fn register(&self, registration: &Registration) -> Result<Session, AuthError> {
        debug!(email = %registration.email, username = %registration.username, "Sending registration request");
        let token = self
            .exchange(REGISTER_PATH, registration, REGISTRATION_FAILED_MESSAGE)
            .await?;
        info!(email = %registration.email, "Registration accepted");
        Ok(token.into_session(&registration.email))
    }

    async fn exchange<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<TokenResponse, AuthError> {
        let url = self.url(path);

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %url, "Auth request failed to send");
                AuthError::connection(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            warn!(error = %e, url = %url, "Failed to read auth response body");
            AuthError::connection(e)
        })?;

        if !status.is_success() {
            let err = AuthError::from_error_body(&text, fallback);
            match &err {
                AuthError::Rejected(reason) => {
                    info!(status = %status, reason = %reason, "Auth request rejected");
                }
                AuthError::Connection(source) => {
                    warn!(status = %status, error = %source, "Unreadable auth error response");
                }
            }
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, url = %url, "Failed to parse auth response");
            AuthError::connection(e)
        })
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidResponse("Access token is not a valid header value".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Fetch the profile of the account the token belongs to
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        if self.token.is_none() {
            return Err(ApiError::Unauthorized);
        }

        let response = self
            .client
            .get(self.url(ME_PATH))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }
}

impl Authenticator for ApiClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.login(credentials).await
    }
}
