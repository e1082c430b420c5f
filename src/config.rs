use crate::audio::encoder::Mp3Encoder;
use crate::defaults;
use crate::error::{BriefcastError, Result};
use crate::tts::TtsEngine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub channel: ChannelConfig,
    pub tts: TtsConfig,
    pub upload: UploadConfig,
    pub generator: GeneratorConfig,
}

/// Where episodes and the feed live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub feed_path: PathBuf,
    /// Public URL the store directory is served under
    pub base_url: String,
}

/// Feed channel metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelConfig {
    pub title: String,
    /// Channel link; empty means the store base URL
    pub link: String,
    pub description: String,
    pub author: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub category: String,
    pub language: String,
}

/// Speech synthesis and assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub engine: TtsEngine,
    pub language: String,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub max_concurrent: usize,
    pub silence_ms: u32,
    pub encoder: Mp3Encoder,
    pub bitrate_kbps: u32,
}

/// Remote asset store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub github_token: Option<String>,
    /// `owner/repo`
    pub github_repo: Option<String>,
    pub release_tag: String,
    pub timeout_secs: u64,
}

/// Topic and script generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub minutes: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::EPISODES_DIR),
            feed_path: PathBuf::from(defaults::FEED_PATH),
            base_url: defaults::BASE_URL.to_string(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: defaults::PODCAST_TITLE.to_string(),
            link: String::new(),
            description: defaults::PODCAST_DESCRIPTION.to_string(),
            author: None,
            email: None,
            image: None,
            category: defaults::PODCAST_CATEGORY.to_string(),
            language: defaults::PODCAST_LANGUAGE.to_string(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: TtsEngine::default(),
            language: defaults::TTS_LANGUAGE.to_string(),
            max_attempts: defaults::MAX_SYNTHESIS_ATTEMPTS,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
            max_concurrent: defaults::MAX_CONCURRENT_SEGMENTS,
            silence_ms: defaults::SEGMENT_SILENCE_MS,
            encoder: Mp3Encoder::default(),
            bitrate_kbps: defaults::MP3_BITRATE_KBPS,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            github_repo: None,
            release_tag: defaults::RELEASE_TAG.to_string(),
            timeout_secs: defaults::UPLOAD_TIMEOUT_SECS,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            minutes: defaults::EPISODE_MINUTES,
        }
    }
}

impl ChannelConfig {
    /// Channel link, falling back to `base_url` when unset.
    pub fn resolved_link<'a>(&'a self, base_url: &'a str) -> &'a str {
        if self.link.trim().is_empty() {
            base_url
        } else {
            &self.link
        }
    }
}

impl TtsConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl UploadConfig {
    /// Token and repository, when both are set.
    pub fn github_credentials(&self) -> Option<(&str, &str)> {
        match (self.github_token.as_deref(), self.github_repo.as_deref()) {
            (Some(token), Some(repo)) if !token.is_empty() && !repo.is_empty() => {
                Some((token, repo))
            }
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    ///
    /// # Errors
    /// `ConfigFileNotFound` when the file is absent, `Config` for invalid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BriefcastError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                BriefcastError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(BriefcastError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tts.max_attempts == 0 {
            return Err(BriefcastError::ConfigInvalidValue {
                key: "tts.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.tts.bitrate_kbps == 0 {
            return Err(BriefcastError::ConfigInvalidValue {
                key: "tts.bitrate_kbps".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.store.base_url.trim().is_empty() {
            return Err(BriefcastError::ConfigInvalidValue {
                key: "store.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - EPISODES_DIR, FEED_PATH, RSS_BASE_URL → store
    /// - PODCAST_TITLE, PODCAST_LINK, PODCAST_DESCRIPTION, PODCAST_AUTHOR,
    ///   PODCAST_EMAIL, PODCAST_IMAGE, PODCAST_CATEGORY → channel
    /// - TTS_ENGINE, TTS_LANGUAGE → tts
    /// - GITHUB_TOKEN, GITHUB_REPO → upload
    /// - GEMINI_API_KEY, OPENAI_API_KEY → generator
    ///
    /// Empty values are ignored, as is an unknown `TTS_ENGINE`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = env_value("EPISODES_DIR") {
            self.store.dir = PathBuf::from(dir);
        }
        if let Some(path) = env_value("FEED_PATH") {
            self.store.feed_path = PathBuf::from(path);
        }
        if let Some(url) = env_value("RSS_BASE_URL") {
            self.store.base_url = url;
        }

        if let Some(title) = env_value("PODCAST_TITLE") {
            self.channel.title = title;
        }
        if let Some(link) = env_value("PODCAST_LINK") {
            self.channel.link = link;
        }
        if let Some(description) = env_value("PODCAST_DESCRIPTION") {
            self.channel.description = description;
        }
        if let Some(author) = env_value("PODCAST_AUTHOR") {
            self.channel.author = Some(author);
        }
        if let Some(email) = env_value("PODCAST_EMAIL") {
            self.channel.email = Some(email);
        }
        if let Some(image) = env_value("PODCAST_IMAGE") {
            self.channel.image = Some(image);
        }
        if let Some(category) = env_value("PODCAST_CATEGORY") {
            self.channel.category = category;
        }

        if let Some(engine) = env_value("TTS_ENGINE") {
            match engine.parse() {
                Ok(engine) => self.tts.engine = engine,
                Err(e) => tracing::warn!(error = %e, "Ignoring TTS_ENGINE"),
            }
        }
        if let Some(language) = env_value("TTS_LANGUAGE") {
            self.tts.language = language;
        }

        if let Some(token) = env_value("GITHUB_TOKEN") {
            self.upload.github_token = Some(token);
        }
        if let Some(repo) = env_value("GITHUB_REPO") {
            self.upload.github_repo = Some(repo);
        }

        if let Some(key) = env_value("GEMINI_API_KEY") {
            self.generator.gemini_api_key = Some(key);
        }
        if let Some(key) = env_value("OPENAI_API_KEY") {
            self.generator.openai_api_key = Some(key);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/briefcast/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("briefcast")
            .join("config.toml")
    }

    /// Render as TOML with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        for secret in [
            &mut shown.upload.github_token,
            &mut shown.generator.gemini_api_key,
            &mut shown.generator.openai_api_key,
        ] {
            if secret.is_some() {
                *secret = Some("********".to_string());
            }
        }
        toml::to_string_pretty(&shown).map_err(|e| BriefcastError::ConfigParse {
            message: e.to_string(),
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
