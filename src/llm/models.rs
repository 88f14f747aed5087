use serde::{Deserialize, Serialize};

/// One prior exchange entry in the generator's role vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenMessage {
    pub role: String,
    pub content: String,
}

impl GenMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenOptions {
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenOptions {
    pub fn from_chat_config(chat: &crate::config::ChatConfig) -> Self {
        Self {
            system_instruction: Some(chat.system_instruction.clone()),
            temperature: chat.temperature,
            max_output_tokens: chat.max_output_tokens,
        }
    }
}
