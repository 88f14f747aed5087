use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ChatError;
use crate::llm::{
    models::{GenMessage, GenOptions},
    TurnGenerator,
};

pub const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonReply {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Stateless single-turn exchange for callers without an identity. The caller
/// supplies the whole history each time; nothing survives the call.
pub struct AnonymousTurnService {
    generator: Arc<dyn TurnGenerator>,
    options: GenOptions,
}

impl AnonymousTurnService {
    pub fn new(generator: Arc<dyn TurnGenerator>, options: GenOptions) -> Self {
        Self { generator, options }
    }

    pub async fn reply(
        &self,
        history: &[serde_json::Value],
        message: &str,
    ) -> Result<AnonReply, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::validation("message must not be empty"));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::validation(format!(
                "message too long (max {} characters)",
                MAX_MESSAGE_CHARS
            )));
        }

        // A malformed entry is dropped, not fatal; the container itself is
        // validated at the request boundary.
        let validated: Vec<GenMessage> = history.iter().filter_map(validate_entry).collect();

        let text = self
            .generator
            .reply(&validated, message, &self.options)
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(ChatError::Generation("empty reply".to_string()));
        }

        Ok(AnonReply {
            message: text.trim().to_string(),
            timestamp: Utc::now(),
        })
    }
}

fn validate_entry(item: &serde_json::Value) -> Option<GenMessage> {
    let role = item.get("role")?.as_str()?;
    if role != "user" && role != "assistant" {
        return None;
    }
    let content = item.get("content")?.as_str()?;
    Some(GenMessage {
        role: role.to_string(),
        content: content.to_string(),
    })
}
