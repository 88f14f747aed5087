use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::llm::{
    models::{GenMessage, GenOptions},
    GeneratorError, TurnGenerator,
};

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
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
impl TurnGenerator for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn reply(
        &self,
        history: &[GenMessage],
        input: &str,
        options: &GenOptions,
    ) -> Result<String, GeneratorError> {
        // Gemini calls the assistant side "model"
        let mut contents: Vec<serde_json::Value> = history
            .iter()
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": input }] }));

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": options.temperature.unwrap_or(0.7),
                "topK": 40,
                "topP": 0.8,
                "maxOutputTokens": options.max_output_tokens.unwrap_or(1000),
            },
        });

        if let Some(system) = &options.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.default_model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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
                "Gemini Error {}: {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        let text = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(GeneratorError::EmptyReply);
        }

        Ok(text)
    }
}
