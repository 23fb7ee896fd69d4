use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use poker_types::{CardValue, ErrorBody, Identity, Role, Room, Session};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("api request failed ({status}): {message}")]
    Request { status: u16, message: String },
    #[error("could not reach the backend: {0}")]
    Network(#[from] reqwest::Error),
}

/// The backend's REST surface, as this client uses it.
///
/// A trait rather than a concrete client so the coordinator can be
/// driven against a fake in tests.
#[async_trait]
pub trait PokerApi: Send + Sync {
    async fn list_rooms(&self) -> Result<Vec<Room>, ApiError>;
    async fn get_room(&self, room_id: &str) -> Result<Room, ApiError>;
    async fn create_room(&self, name: &str) -> Result<Room, ApiError>;
    async fn join_room(&self, room_id: &str, role: Role) -> Result<Room, ApiError>;
    async fn join_by_code(&self, invite_code: &str, role: Role) -> Result<Room, ApiError>;
    async fn start_session(
        &self,
        room_id: &str,
        topic: &str,
        topic_link: Option<&str>,
    ) -> Result<Session, ApiError>;
    async fn cast_vote(&self, session_id: &str, vote: CardValue) -> Result<(), ApiError>;
    async fn reveal_votes(&self, session_id: &str) -> Result<(), ApiError>;
}

/// reqwest-backed implementation of [`PokerApi`].
///
/// Every request carries the anonymous identity; the backend has no
/// account system, it keys everything off the anonymous id.
pub struct HttpApi {
    base_url: String,
    identity: Identity,
    client: reqwest::Client,
}

/// Join responses wrap the room.
#[derive(Deserialize)]
struct JoinResponse {
    room: Room,
}

impl HttpApi {
    pub fn new(
        base_url: String,
        identity: Identity,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            identity,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn join_body(&self, role: Role) -> serde_json::Value {
        json!({
            "name": self.identity.name,
            "anonymousId": self.identity.anonymous_id,
            "role": role,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("HTTP error! status: {}", status.as_u16()));
        Err(ApiError::Request {
            status: status.as_u16(),
            message,
        })
    }

    async fn check(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("HTTP error! status: {}", status.as_u16()));
        Err(ApiError::Request {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PokerApi for HttpApi {
    async fn list_rooms(&self) -> Result<Vec<Room>, ApiError> {
        let response = self.client.get(self.url("/api/rooms")).send().await?;
        Self::decode(response).await
    }

    async fn get_room(&self, room_id: &str) -> Result<Room, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/rooms/{room_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn create_room(&self, name: &str) -> Result<Room, ApiError> {
        debug!(name, "creating room");
        let body = json!({
            "name": name,
            "hostName": self.identity.name,
            "hostAnonymousId": self.identity.anonymous_id,
        });
        let response = self
            .client
            .post(self.url("/api/rooms"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn join_room(&self, room_id: &str, role: Role) -> Result<Room, ApiError> {
        debug!(room_id, ?role, "joining room");
        let response = self
            .client
            .post(self.url(&format!("/api/rooms/{room_id}/join")))
            .json(&self.join_body(role))
            .send()
            .await?;
        let joined: JoinResponse = Self::decode(response).await?;
        Ok(joined.room)
    }

    async fn join_by_code(&self, invite_code: &str, role: Role) -> Result<Room, ApiError> {
        debug!(invite_code, ?role, "joining room by invite code");
        let mut body = self.join_body(role);
        body["inviteCode"] = json!(invite_code);
        let response = self
            .client
            .post(self.url("/api/rooms/join-by-code"))
            .json(&body)
            .send()
            .await?;
        let joined: JoinResponse = Self::decode(response).await?;
        Ok(joined.room)
    }

    async fn start_session(
        &self,
        room_id: &str,
        topic: &str,
        topic_link: Option<&str>,
    ) -> Result<Session, ApiError> {
        let body = json!({
            "roomId": room_id,
            "topic": topic,
            "topicLink": topic_link,
            "anonymousId": self.identity.anonymous_id,
        });
        let response = self
            .client
            .post(self.url("/api/sessions"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn cast_vote(&self, session_id: &str, vote: CardValue) -> Result<(), ApiError> {
        let body = json!({
            "vote": vote,
            "anonymousId": self.identity.anonymous_id,
        });
        let response = self
            .client
            .post(self.url(&format!("/api/sessions/{session_id}/vote")))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn reveal_votes(&self, session_id: &str) -> Result<(), ApiError> {
        let body = json!({ "anonymousId": self.identity.anonymous_id });
        let response = self
            .client
            .post(self.url(&format!("/api/sessions/{session_id}/reveal")))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }
}
