use crate::audio::clip::AudioClip;
use crate::error::{BriefcastError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Trait for text-to-speech synthesis.
///
/// One call turns one piece of text into decoded audio. Implementations do
/// not retry; [`crate::tts::segment::SegmentSynthesizer`] owns the retry policy.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language` (ISO 639-1, e.g. "en").
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip>;

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

/// Implement SpeechSynthesizer for Arc<T> so one backend can serve many tasks.
#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip> {
        (**self).synthesize(text, language).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Sample rate of mock output.
pub const MOCK_SAMPLE_RATE: u32 = 16000;

/// Deterministic synthesizer for tests and dry runs.
///
/// Produces a tone whose length is 10 ms per character and whose pitch depends
/// on the text, so different segments are distinguishable.
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    should_fail: bool,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    /// Configure the mock to fail on every call
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// The clip this mock returns for `text`.
    pub fn clip_for(text: &str) -> AudioClip {
        let len = text.chars().count() * (MOCK_SAMPLE_RATE as usize / 100);
        let step = 0.01 + (text.bytes().map(u32::from).sum::<u32>() % 50) as f32 / 1000.0;
        let samples = (0..len).map(|i| 0.5 * (i as f32 * step).sin()).collect();
        AudioClip::new(samples, MOCK_SAMPLE_RATE)
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<AudioClip> {
        if self.should_fail {
            return Err(BriefcastError::Tts {
                message: "mock synthesis failure".to_string(),
            });
        }
        Ok(Self::clip_for(text))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Synthesizer that fails a fixed number of times before behaving like
/// [`MockSynthesizer`]. Only texts containing `trigger` are affected.
#[derive(Debug)]
pub struct FlakySynthesizer {
    trigger: String,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FlakySynthesizer {
    pub fn new(trigger: &str, failures: u32) -> Self {
        Self {
            trigger: trigger.to_string(),
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    /// Total number of synthesize calls seen so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FlakySynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<AudioClip> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains(&self.trigger)
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(BriefcastError::Tts {
                message: format!("transient failure for '{}'", text),
            });
        }
        Ok(MockSynthesizer::clip_for(text))
    }

    fn name(&self) -> &str {
        "flaky"
    }
}
