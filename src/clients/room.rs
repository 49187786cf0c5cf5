//! Room service gateway
//!
//! Creates rooms for matched pairs and answers "is this user already in a
//! room?". Room state is owned entirely by the external service; the core
//! only ever holds the returned reference.

use crate::clients::{status_error, transport_error};
use crate::error::{MatchingError, Result};
use crate::types::{RoomReference, UserId};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "room-service";

/// Contract consumed from the external room service
#[async_trait]
pub trait RoomClient: Send + Sync {
    /// Create a room holding both matched users and the chosen question
    async fn create_room(
        &self,
        user_ids: &[UserId],
        question_id: &str,
        lang_slug: &str,
    ) -> Result<RoomReference>;

    /// Look up the caller's current room, forwarding their session token.
    /// `Ok(None)` when the room service reports 404 (not in any room).
    async fn find_room(&self, session_token: &str) -> Result<Option<serde_json::Value>>;
}

/// reqwest-backed room service gateway
#[derive(Debug, Clone)]
pub struct HttpRoomClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRoomClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RoomClient for HttpRoomClient {
    async fn create_room(
        &self,
        user_ids: &[UserId],
        question_id: &str,
        lang_slug: &str,
    ) -> Result<RoomReference> {
        let url = format!("{}/room-service/rooms", self.base_url);
        let body = json!({
            "user-ids": user_ids,
            "question-id": question_id,
            "question-lang-slug": lang_slug,
        });

        debug!("Creating room for users {:?} at {}", user_ids, url);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let data: serde_json::Value =
            response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        let room_id = data
            .get("room-id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MatchingError::Downstream {
                service: SERVICE.to_string(),
                status: 500,
                message: "room creation response missing room-id".to_string(),
            })?
            .to_string();

        Ok(RoomReference {
            room_id,
            user_ids: user_ids.to_vec(),
            question_id: question_id.to_string(),
            lang_slug: lang_slug.to_string(),
        })
    }

    async fn find_room(&self, session_token: &str) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/room-service/room", self.base_url);

        let response = self
            .http
            .get(&url)
            .header("Cookie", format!("access-token={}", session_token))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let data: serde_json::Value =
            response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(Some(data))
    }
}
