//! OpenAI chat completions.

use crate::content::TextModel;
use crate::defaults;
use crate::error::{BriefcastError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.7;

pub struct OpenAiModel {
    http: Client,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(defaults::HTTP_TIMEOUT * 4)
            .build()
            .map_err(|e| BriefcastError::Generation {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

fn request_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "max_tokens": MAX_TOKENS,
        "temperature": TEMPERATURE,
    })
}

fn extract_text(val: &Value) -> Option<String> {
    val.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[async_trait]
impl TextModel for OpenAiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, "POST chat/completions");

        let resp = self
            .http
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.model, prompt))
            .send()
            .await
            .map_err(|e| BriefcastError::Generation {
                message: format!("OpenAI request failed: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, body = %text, "OpenAI error");
            return Err(BriefcastError::Generation {
                message: format!("OpenAI returned {status}"),
            });
        }

        let val: Value = resp.json().await.map_err(|e| BriefcastError::Generation {
            message: format!("Failed to parse OpenAI response: {e}"),
        })?;
        extract_text(&val).ok_or_else(|| BriefcastError::Generation {
            message: "Missing choices[0].message.content".to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = request_body("gpt-4o-mini", "Write a script");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Write a script");
        assert_eq!(body["max_tokens"], 1500);
    }

    #[test]
    fn test_extract_text() {
        let val = json!({ "choices": [{ "message": { "content": "Host: Hi." } }] });
        assert_eq!(extract_text(&val).as_deref(), Some("Host: Hi."));
        assert_eq!(extract_text(&json!({ "choices": [] })), None);
    }
}
