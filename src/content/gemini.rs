//! Google Gemini over the REST `generateContent` endpoint.

use crate::content::TextModel;
use crate::defaults;
use crate::error::{BriefcastError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiModel {
    http: Client,
    api_key: String,
    model: String,
    search_grounding: bool,
}

impl GeminiModel {
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
            search_grounding: false,
        })
    }

    /// Let the model consult Google Search before answering.
    pub fn with_search_grounding(mut self) -> Self {
        self.search_grounding = true;
        self
    }
}

fn request_body(prompt: &str, search_grounding: bool) -> Value {
    let mut body = json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
    });
    if search_grounding {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    body
}

/// Concatenate the text parts of the first candidate.
fn extract_text(val: &Value) -> Option<String> {
    let parts = val
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl TextModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", API_BASE, self.model);
        debug!(model = %self.model, grounded = self.search_grounding, "POST generateContent");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt, self.search_grounding))
            .send()
            .await
            .map_err(|e| BriefcastError::Generation {
                message: format!("Gemini request failed: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, body = %text, "Gemini error");
            return Err(BriefcastError::Generation {
                message: format!("Gemini returned {status}"),
            });
        }

        let val: Value = resp.json().await.map_err(|e| BriefcastError::Generation {
            message: format!("Failed to parse Gemini response: {e}"),
        })?;
        extract_text(&val).ok_or_else(|| BriefcastError::Generation {
            message: "Gemini response had no text".to_string(),
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
    fn test_request_body_grounding() {
        let plain = request_body("hi", false);
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "hi");
        assert!(plain.get("tools").is_none());

        let grounded = request_body("hi", true);
        assert!(grounded["tools"][0].get("google_search").is_some());
    }

    #[test]
    fn test_extract_joins_parts() {
        let val = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Host: Hi. " }, { "text": "Guest: Hey." }] }
            }]
        });
        assert_eq!(extract_text(&val).as_deref(), Some("Host: Hi. Guest: Hey."));
    }

    #[test]
    fn test_extract_missing_or_blank() {
        assert_eq!(extract_text(&json!({ "candidates": [] })), None);
        assert_eq!(
            extract_text(&json!({ "candidates": [{ "content": { "parts": [{ "text": " " }] } }] })),
            None
        );
        assert_eq!(extract_text(&json!({ "promptFeedback": {} })), None);
    }
}
