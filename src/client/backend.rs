use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::json;
use uuid::Uuid;

use crate::chat::{AnonReply, TurnExchange};
use crate::db::SessionWithTurns;
use crate::error::ChatError;
use crate::llm::models::GenMessage;

/// The server as seen from the client core. One implementation speaks HTTP;
/// tests substitute their own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<SessionWithTurns>, ChatError>;
    async fn create_session(&self, title: &str) -> Result<SessionWithTurns, ChatError>;
    async fn rename_session(&self, id: Uuid, title: &str)
        -> Result<SessionWithTurns, ChatError>;
    async fn delete_session(&self, id: Uuid) -> Result<(), ChatError>;
    async fn submit_turn(&self, id: Uuid, content: &str) -> Result<TurnExchange, ChatError>;
    async fn anon_reply(
        &self,
        history: Vec<GenMessage>,
        message: &str,
    ) -> Result<AnonReply, ChatError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        builder
    }

    async fn send<T: serde::de::DeserializeOwned>(
        builder: RequestBuilder,
    ) -> Result<T, ChatError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let msg = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(match status.as_u16() {
                400 => ChatError::Validation(msg),
                401 => ChatError::Unauthenticated,
                404 => ChatError::NotFound,
                _ => ChatError::Generation(msg),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_sessions(&self) -> Result<Vec<SessionWithTurns>, ChatError> {
        Self::send(self.request(Method::GET, "/sessions")).await
    }

    async fn create_session(&self, title: &str) -> Result<SessionWithTurns, ChatError> {
        Self::send(self.request(Method::POST, "/sessions").json(&json!({ "title": title }))).await
    }

    async fn rename_session(
        &self,
        id: Uuid,
        title: &str,
    ) -> Result<SessionWithTurns, ChatError> {
        Self::send(
            self.request(Method::PATCH, &format!("/sessions/{}", id))
                .json(&json!({ "title": title })),
        )
        .await
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), ChatError> {
        let _: serde_json::Value =
            Self::send(self.request(Method::DELETE, &format!("/sessions/{}", id))).await?;
        Ok(())
    }

    async fn submit_turn(&self, id: Uuid, content: &str) -> Result<TurnExchange, ChatError> {
        Self::send(
            self.request(Method::POST, &format!("/sessions/{}/turns", id))
                .json(&json!({ "content": content, "role": "USER" })),
        )
        .await
    }

    async fn anon_reply(
        &self,
        history: Vec<GenMessage>,
        message: &str,
    ) -> Result<AnonReply, ChatError> {
        Self::send(
            self.request(Method::POST, "/anon-reply")
                .json(&json!({ "message": message, "history": history })),
        )
        .await
    }
}
