use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::llm::{
    models::{GenMessage, GenOptions},
    GeneratorError, TurnGenerator,
};

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String, default_model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            default_model,
        }
    }
}

#[async_trait]
impl TurnGenerator for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn reply(
        &self,
        history: &[GenMessage],
        input: &str,
        options: &GenOptions,
    ) -> Result<String, GeneratorError> {
        let mut messages: Vec<GenMessage> = Vec::with_capacity(history.len() + 2);
        if let Some(system) = &options.system_instruction {
            messages.push(GenMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend_from_slice(history);
        messages.push(GenMessage::user(input));

        let body = json!({
            "model": self.default_model,
            "messages": messages,
            "temperature": options.temperature.unwrap_or(0.7),
            "max_tokens": options.max_output_tokens.unwrap_or(1000),
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(GeneratorError::RateLimited);
            }
            return Err(GeneratorError::Api(format!(
                "OpenAI Error {}: {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(GeneratorError::EmptyReply);
        }

        Ok(content)
    }
}
