//! Identity provider gateway
//!
//! Session token resolution is delegated to the external identity provider;
//! the core never interprets token contents itself.

use crate::clients::{status_error, transport_error};
use crate::error::{MatchingError, Result};
use crate::types::UserId;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "identity-service";

/// Contract consumed from the external identity provider
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Resolve a session token to the user it belongs to.
    /// Fails with an unauthorized error for unknown or expired tokens.
    async fn resolve(&self, session_token: &str) -> Result<UserId>;
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    #[serde(rename = "user-id")]
    user_id: String,
}

/// reqwest-backed identity provider gateway
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn resolve(&self, session_token: &str) -> Result<UserId> {
        let url = format!("{}/identity", self.base_url);
        debug!("Resolving session token against {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("session-token", session_token)])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if response.status().as_u16() == 401 {
            return Err(MatchingError::Unauthorized {
                message: "session token rejected by identity provider".to_string(),
            }
            .into());
        }
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let identity: IdentityResponse =
            response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(identity.user_id)
    }
}
