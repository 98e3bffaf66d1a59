//! API client for communicating with the Singlelink REST API.
//!
//! This module provides the `ApiClient` struct for logging in and making
//! authenticated account lookups.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{Credential, LoginResponse, User};

use super::{AccountDirectory, ApiError, AuthApi};

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured (the API's development port).
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3333";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "login";
const ACCOUNTS_PATH: &str = "accounts";

/// API client for Singlelink.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client with the default request timeout
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidResponse(format!(
                "Base URL cannot carry paths: {}",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    /// Every request sent through the returned client carries the token.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn auth_headers(&self, bearer: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = bearer.or(self.token.as_deref()) {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidToken)?;
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
            warn!(status = %status, "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, bearer: Option<&str>) -> Result<T, ApiError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .headers(self.auth_headers(bearer)?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::decode(response, url.path()).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<T, ApiError> {
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url.clone())
            .headers(self.auth_headers(None)?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::decode(response, url.path()).await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credential: &Credential) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&[LOGIN_PATH]);
        self.post(url, credential).await
    }
}

#[async_trait]
impl AccountDirectory for ApiClient {
    async fn get_account_by_id(&self, user_id: &str, bearer: Option<&str>) -> Result<User, ApiError> {
        let url = self.endpoint(&[ACCOUNTS_PATH, user_id]);
        self.get(url, bearer).await
    }
}
