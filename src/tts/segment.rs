//! Per-segment synthesis with bounded retry.
//!
//! Every segment gets up to `max_attempts` tries with a fixed backoff between
//! them. Segments can be dispatched concurrently; results always come back in
//! segment order.

use crate::audio::clip::AudioClip;
use crate::defaults;
use crate::error::{BriefcastError, Result};
use crate::script::Segment;
use crate::tts::synthesizer::SpeechSynthesizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How often and how patiently a segment is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed wait between attempts; it does not grow.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_SYNTHESIS_ATTEMPTS,
            backoff: Duration::from_millis(defaults::RETRY_BACKOFF_MS),
        }
    }
}

/// Synthesize one segment, retrying per `policy`.
///
/// A backend returning no samples counts as a failed attempt.
///
/// # Errors
/// [`BriefcastError::Synthesis`] carrying the segment index and the last
/// backend error once all attempts are used up.
pub async fn synthesize_with_retry(
    backend: &dyn SpeechSynthesizer,
    segment: &Segment,
    language: &str,
    policy: RetryPolicy,
) -> Result<AudioClip> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match backend.synthesize(&segment.text, language).await {
            Ok(clip) if clip.is_empty() => Err(BriefcastError::Tts {
                message: format!("{} returned no audio", backend.name()),
            }),
            other => other,
        };

        match result {
            Ok(clip) => {
                if attempt > 1 {
                    info!(segment = segment.index, attempt, "Segment synthesized after retry");
                } else {
                    debug!(segment = segment.index, "Segment synthesized");
                }
                return Ok(clip);
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    segment = segment.index,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Segment synthesis failed, retrying in {:?}",
                    policy.backoff
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    segment = segment.index,
                    attempts = max_attempts,
                    error = %e,
                    "Segment synthesis failed after all attempts"
                );
                return Err(BriefcastError::Synthesis {
                    segment_index: segment.index,
                    cause: e.to_string(),
                });
            }
        }
    }
}

/// Drives a speech backend over a whole script.
#[derive(Clone)]
pub struct SegmentSynthesizer {
    backend: Arc<dyn SpeechSynthesizer>,
    policy: RetryPolicy,
    max_concurrent: usize,
}

impl SegmentSynthesizer {
    pub fn new(backend: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
            max_concurrent: defaults::MAX_CONCURRENT_SEGMENTS,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Allow up to `n` segments in flight (minimum 1).
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Synthesize a single segment.
    pub async fn synthesize(&self, segment: &Segment, language: &str) -> Result<AudioClip> {
        synthesize_with_retry(self.backend.as_ref(), segment, language, self.policy).await
    }

    /// Synthesize every segment, returning clips in segment order.
    ///
    /// The first segment to exhaust its retries aborts the remaining work.
    pub async fn synthesize_all(
        &self,
        segments: &[Segment],
        language: &str,
    ) -> Result<Vec<AudioClip>> {
        info!(
            segments = segments.len(),
            backend = self.backend.name(),
            max_concurrent = self.max_concurrent,
            "Synthesizing script"
        );

        if self.max_concurrent <= 1 {
            let mut clips = Vec::with_capacity(segments.len());
            for segment in segments {
                clips.push(self.synthesize(segment, language).await?);
            }
            return Ok(clips);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (position, segment) in segments.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let backend = self.backend.clone();
            let language = language.to_string();
            let policy = self.policy;

            tasks.spawn(async move {
                // Hold permit until done
                let _permit = semaphore.acquire_owned().await;
                let result =
                    synthesize_with_retry(backend.as_ref(), &segment, &language, policy).await;
                (position, result)
            });
        }

        let mut slots: Vec<Option<AudioClip>> = vec![None; segments.len()];
        while let Some(joined) = tasks.join_next().await {
            let (position, result) = joined.map_err(|e| {
                BriefcastError::Other(format!("Synthesis task panicked: {}", e))
            })?;
            match result {
                Ok(clip) => slots[position] = Some(clip),
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .zip(segments)
            .map(|(slot, segment)| {
                slot.ok_or_else(|| BriefcastError::Synthesis {
                    segment_index: segment.index,
                    cause: "no result collected".to_string(),
                })
            })
            .collect()
    }
}
