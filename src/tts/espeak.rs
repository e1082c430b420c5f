//! Offline speech through the `espeak-ng` command-line engine.
//!
//! Each call renders into a private temporary WAV which is read back with
//! hound and deleted before returning, on success and on failure alike.

use crate::audio::clip::AudioClip;
use crate::error::{BriefcastError, Result};
use crate::tts::synthesizer::SpeechSynthesizer;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default speaking rate in words per minute.
pub const DEFAULT_WPM: u32 = 160;

#[derive(Debug, Clone)]
pub struct EspeakSynthesizer {
    program: PathBuf,
    words_per_minute: u32,
    timeout: Duration,
    temp_dir: PathBuf,
}

impl EspeakSynthesizer {
    pub fn new() -> Self {
        let program = std::env::var("ESPEAK_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("espeak-ng"));
        Self {
            program,
            words_per_minute: DEFAULT_WPM,
            timeout: Duration::from_secs(60),
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_words_per_minute(mut self, wpm: u32) -> Self {
        self.words_per_minute = wpm.clamp(80, 450);
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    async fn render(&self, text: &str, language: &str, out_wav: &std::path::Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        if !language.is_empty() {
            cmd.arg("-v").arg(language);
        }
        cmd.arg("-s").arg(self.words_per_minute.to_string());
        cmd.arg("-w").arg(out_wav);
        cmd.arg("--").arg(text);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?cmd, "Running espeak-ng");
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| BriefcastError::Tts {
                message: format!("espeak-ng timed out after {:?}", self.timeout),
            })?
            .map_err(|e| BriefcastError::Tts {
                message: format!("Failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(BriefcastError::Tts {
                message: format!(
                    "espeak-ng failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip> {
        let temp = tempfile::Builder::new()
            .prefix("briefcast-tts-")
            .suffix(".wav")
            .tempfile_in(&self.temp_dir)?;

        let result = match self.render(text, language, temp.path()).await {
            Ok(()) => match tokio::fs::read(temp.path()).await {
                Ok(bytes) => AudioClip::from_wav_bytes(&bytes),
                Err(e) => Err(BriefcastError::Tts {
                    message: format!("Failed to read espeak-ng output: {}", e),
                }),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = temp.close() {
            warn!(error = %e, "Failed to remove temporary speech file");
        }
        result
    }

    fn name(&self) -> &str {
        "espeak-ng"
    }
}
