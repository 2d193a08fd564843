//! HTTP client for the migration control plane.
//!
//! Provides a minimal client with bearer-token auth, generic GET/POST helpers
//! that surface failures as [`ApiError`] (status code plus raw body), and the
//! [`ControlPlane`] trait that the services crate programs against. Domain
//! calls for both API generations live in [`api`].

pub mod api;
pub mod control_plane;

use anyhow::{Context, Result};
use bucketshift_core::{ApiError, Config, Credentials, ProtocolVersion};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Authentication strategy for the API.
#[derive(Clone)]
pub enum Auth {
    /// No credentials (only used for the login call).
    Anonymous,
    /// `Authorization: Bearer {token}`
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Anonymous => write!(f, "Anonymous"),
            Auth::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}

/// HTTP client for the control plane, bound to one API generation.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
    protocol: ProtocolVersion,
}

impl ApiClient {
    pub fn new(
        base_url: String,
        auth: Auth,
        protocol: ProtocolVersion,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            protocol,
        })
    }

    /// Build an authenticated client from configuration, logging in first when
    /// the configuration carries a username and password instead of an API key.
    pub async fn connect(config: &Config) -> Result<Self> {
        let token = match &config.credentials {
            Credentials::ApiKey(key) => key.clone(),
            Credentials::Login { username, password } => {
                let anonymous = Self::new(
                    config.api_url.clone(),
                    Auth::Anonymous,
                    config.protocol,
                    config.http_timeout,
                )?;
                anonymous
                    .authenticate(username, password)
                    .await
                    .context("Failed to log in to the control plane")?
            }
        };

        Self::new(
            config.api_url.clone(),
            Auth::Bearer(token),
            config.protocol,
            config.http_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Anonymous => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
        }
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "GET");
        let request = self.apply_auth(self.client.get(&url));
        Self::send(request).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "POST");
        let request = self.apply_auth(self.client.post(&url).json(body));
        Self::send(request).await
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

pub use control_plane::ControlPlane;
