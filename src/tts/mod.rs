//! Text-to-speech: backends and the per-segment retry driver.

pub mod espeak;
#[cfg(feature = "http")]
pub mod google;
pub mod segment;
pub mod synthesizer;

pub use segment::{RetryPolicy, SegmentSynthesizer, synthesize_with_retry};
pub use synthesizer::{MockSynthesizer, SpeechSynthesizer};

use crate::error::{BriefcastError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which speech backend a run uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsEngine {
    /// Google Translate TTS over HTTP (needs network)
    #[default]
    Google,
    /// Local espeak-ng binary
    Espeak,
    /// Deterministic tones, no speech
    Mock,
}

impl std::str::FromStr for TtsEngine {
    type Err = BriefcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "gtts" => Ok(TtsEngine::Google),
            "espeak" | "espeak-ng" => Ok(TtsEngine::Espeak),
            "mock" => Ok(TtsEngine::Mock),
            other => Err(BriefcastError::ConfigInvalidValue {
                key: "tts.engine".to_string(),
                message: format!("unknown engine '{}' (expected google, espeak or mock)", other),
            }),
        }
    }
}

/// Construct the backend for `engine`.
pub fn build_synthesizer(engine: TtsEngine) -> Result<Arc<dyn SpeechSynthesizer>> {
    match engine {
        #[cfg(feature = "http")]
        TtsEngine::Google => Ok(Arc::new(google::GoogleTranslateSynthesizer::new()?)),
        #[cfg(not(feature = "http"))]
        TtsEngine::Google => Err(BriefcastError::ConfigInvalidValue {
            key: "tts.engine".to_string(),
            message: "google engine requires the 'http' feature".to_string(),
        }),
        TtsEngine::Espeak => Ok(Arc::new(espeak::EspeakSynthesizer::new())),
        TtsEngine::Mock => Ok(Arc::new(MockSynthesizer::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine_aliases() {
        assert_eq!("gtts".parse::<TtsEngine>().unwrap(), TtsEngine::Google);
        assert_eq!("espeak-ng".parse::<TtsEngine>().unwrap(), TtsEngine::Espeak);
        assert_eq!("Mock".parse::<TtsEngine>().unwrap(), TtsEngine::Mock);
        assert!("polly".parse::<TtsEngine>().is_err());
    }

    #[test]
    fn test_build_mock_and_espeak() {
        assert_eq!(build_synthesizer(TtsEngine::Mock).unwrap().name(), "mock");
        assert_eq!(
            build_synthesizer(TtsEngine::Espeak).unwrap().name(),
            "espeak-ng"
        );
    }
}
