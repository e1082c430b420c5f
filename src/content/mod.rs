//! Topic selection and script generation through hosted text models.
//!
//! Every step here has a built-in fallback, so a run without API keys (or
//! with an outage) still produces a speakable script.

#[cfg(feature = "http")]
pub mod gemini;
pub mod generator;
#[cfg(feature = "http")]
pub mod openai;

pub use generator::{EpisodeScript, ScriptGenerator, TopicPicker, script_prompt};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A text-in, text-out language model.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Complete `prompt`, returning the model's text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Short model name for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: TextModel + ?Sized> TextModel for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Models built from configuration: the grounded topic model and the
/// ordered list tried for scripts.
#[derive(Default)]
pub struct Models {
    pub topic: Option<Arc<dyn TextModel>>,
    pub script: Vec<Arc<dyn TextModel>>,
}

/// Build the configured models. Missing keys simply leave a model out.
#[cfg(feature = "http")]
pub fn models_from_config(config: &crate::config::GeneratorConfig) -> Result<Models> {
    let mut models = Models::default();

    if let Some(key) = config.gemini_api_key.as_deref().filter(|k| !k.is_empty()) {
        models.topic = Some(Arc::new(
            gemini::GeminiModel::new(key, &config.gemini_model)?.with_search_grounding(),
        ));
        models
            .script
            .push(Arc::new(gemini::GeminiModel::new(key, &config.gemini_model)?));
    }
    if let Some(key) = config.openai_api_key.as_deref().filter(|k| !k.is_empty()) {
        models
            .script
            .push(Arc::new(openai::OpenAiModel::new(key, &config.openai_model)?));
    }

    Ok(models)
}

#[cfg(not(feature = "http"))]
pub fn models_from_config(_config: &crate::config::GeneratorConfig) -> Result<Models> {
    Ok(Models::default())
}
