pub mod gemini;
pub mod models;
pub mod openai;

use gemini::GeminiProvider;
use openai::OpenAiProvider;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use models::{GenMessage, GenOptions};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error: {0}")]
    Api(String),
    #[error("Empty reply from model")]
    EmptyReply,
    #[error("Rate Limited")]
    RateLimited,
}

/// The boundary to the upstream model: ordered history plus the new input,
/// one non-empty reply string out.
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn reply(
        &self,
        history: &[GenMessage],
        input: &str,
        options: &GenOptions,
    ) -> Result<String, GeneratorError>;
}

pub struct GeneratorFactory;

impl GeneratorFactory {
    pub fn create_default(config: &AppConfig) -> Option<Arc<dyn TurnGenerator>> {
        match config.llm.provider.as_str() {
            "gemini" => {
                let cfg = config.llm.gemini.as_ref()?;
                Some(Arc::new(GeminiProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.default_model.clone(),
                )))
            }
            "openai" => {
                let cfg = config.llm.openai.as_ref()?;
                Some(Arc::new(OpenAiProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.default_model.clone(),
                )))
            }
            _ => None,
        }
    }
}
