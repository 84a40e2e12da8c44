//! ============================================================================
//! Access Client - HTTP calls to the registration and access-check endpoints
//! ============================================================================

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::config::ControllerConfig;
use crate::error::AccessError;
use crate::types::{AccessDecision, CheckAccessRequest, RegisterRequest, RegistrationReceipt};

/// Registration endpoint path
pub const REGISTER_PATH: &str = "/api/register/";

/// Access-check endpoint path
pub const CHECK_ACCESS_PATH: &str = "/api/check-access/";

/// Remote side of the access controller
#[async_trait]
pub trait AccessApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<RegistrationReceipt, AccessError>;

    async fn check_access(&self, request: &CheckAccessRequest) -> Result<AccessDecision, AccessError>;
}

/// `AccessApi` over JSON POST requests
pub struct HttpAccessApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAccessApi {
    pub fn new(config: &ControllerConfig) -> Result<Self, AccessError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AccessError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, AccessError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let transport = |source: reqwest::Error| AccessError::Transport {
            endpoint: path.to_string(),
            source,
        };

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AccessError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|e| AccessError::Decode {
            endpoint: path.to_string(),
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl AccessApi for HttpAccessApi {
    async fn register(&self, request: &RegisterRequest) -> Result<RegistrationReceipt, AccessError> {
        self.post_json(REGISTER_PATH, request).await
    }

    async fn check_access(&self, request: &CheckAccessRequest) -> Result<AccessDecision, AccessError> {
        self.post_json(CHECK_ACCESS_PATH, request).await
    }
}
