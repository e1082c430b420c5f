//! Speech through the public Google Translate TTS endpoint.
//!
//! The endpoint only accepts short inputs, so text is split on word
//! boundaries into chunks of at most [`MAX_CHUNK_CHARS`] characters. Each
//! chunk comes back as MP3, is decoded with symphonia and appended.

use crate::audio::clip::AudioClip;
use crate::audio::decode::decode_bytes;
use crate::defaults;
use crate::error::{BriefcastError, Result};
use crate::tts::synthesizer::SpeechSynthesizer;
use async_trait::async_trait;
use tracing::debug;

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Longest text the endpoint accepts per request.
pub const MAX_CHUNK_CHARS: usize = 100;

const USER_AGENT: &str = concat!("briefcast/", env!("CARGO_PKG_VERSION"));

pub struct GoogleTranslateSynthesizer {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslateSynthesizer {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(defaults::HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BriefcastError::Tts {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: TRANSLATE_TTS_URL.to_string(),
        })
    }

    /// Point at a different endpoint (self-hosted mirror, test server).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ],
        )
        .map_err(|e| BriefcastError::Tts {
            message: format!("Invalid TTS endpoint: {e}"),
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BriefcastError::Tts {
                message: format!("TTS request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(BriefcastError::Tts {
                message: format!("TTS endpoint returned status {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| BriefcastError::Tts {
            message: format!("Failed to read TTS response: {e}"),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        let total = chunks.len();
        let mut merged: Option<AudioClip> = None;

        for (idx, chunk) in chunks.iter().enumerate() {
            debug!(idx, total, chars = chunk.len(), "Fetching TTS chunk");
            let bytes = self.fetch_chunk(chunk, language, idx, total).await?;

            // Decoding is CPU-bound; keep it off the async workers
            let clip = tokio::task::spawn_blocking(move || decode_bytes(bytes, "mp3"))
                .await
                .map_err(|e| BriefcastError::Tts {
                    message: format!("Decode task panicked: {e}"),
                })??;

            match merged.as_mut() {
                Some(m) => m.extend(&clip),
                None => merged = Some(clip),
            }
        }

        merged.ok_or_else(|| BriefcastError::Tts {
            message: "nothing to synthesize".to_string(),
        })
    }

    fn name(&self) -> &str {
        "google-translate"
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Breaks on whitespace; a single word longer than `max_chars` is cut.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
