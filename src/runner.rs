//! End-to-end episode production.
//!
//! Orchestrates the complete flow:
//! topic → script → segments → speech → track → publish

use crate::audio::assembler::{TrackAssembler, episode_filename};
use crate::audio::encoder::Mp3Encoder;
use crate::config::Config;
use crate::content::{self, ScriptGenerator, TopicPicker};
use crate::error::{BriefcastError, Result};
use crate::publish::{EpisodeStore, FeedBuilder, Publisher};
use crate::script::segment;
use crate::tts::{self, MockSynthesizer, RetryPolicy, SegmentSynthesizer};
use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub topic: String,
    pub title: String,
    /// Stored episode audio (or the scratch WAV of a dry run)
    pub episode: PathBuf,
    /// Archived script, absent for dry runs
    pub script: Option<PathBuf>,
    pub segments: usize,
    pub duration: Duration,
}

/// Everything one run needs, wired up front.
pub struct Runner {
    store: EpisodeStore,
    topics: TopicPicker,
    scripts: ScriptGenerator,
    synthesizer: SegmentSynthesizer,
    assembler: TrackAssembler,
    publisher: Option<Publisher>,
    language: String,
    encoder: Mp3Encoder,
    bitrate_kbps: u32,
}

impl Runner {
    /// Build a runner from configuration.
    ///
    /// A dry run speaks with the mock synthesizer, skips the text models,
    /// writes a WAV to the system temp directory and publishes nothing.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        let store = EpisodeStore::new(&config.store.dir);

        let (backend, models) = if dry_run {
            let backend: Arc<dyn tts::SpeechSynthesizer> = Arc::new(MockSynthesizer::new());
            (backend, content::Models::default())
        } else {
            (
                tts::build_synthesizer(config.tts.engine)?,
                content::models_from_config(&config.generator)?,
            )
        };

        let synthesizer = SegmentSynthesizer::new(backend)
            .with_policy(RetryPolicy {
                max_attempts: config.tts.max_attempts,
                backoff: config.tts.retry_backoff(),
            })
            .with_max_concurrent(config.tts.max_concurrent);

        let publisher = if dry_run {
            None
        } else {
            Some(build_publisher(config, store.clone())?)
        };

        Ok(Self {
            store,
            topics: TopicPicker::new(models.topic),
            scripts: ScriptGenerator::new(models.script).with_minutes(config.generator.minutes),
            synthesizer,
            assembler: TrackAssembler::new(config.tts.silence_ms),
            publisher,
            language: config.tts.language.clone(),
            encoder: config.tts.encoder,
            bitrate_kbps: config.tts.bitrate_kbps,
        })
    }

    /// Assemble a runner from explicit parts.
    pub fn new(
        store: EpisodeStore,
        topics: TopicPicker,
        scripts: ScriptGenerator,
        synthesizer: SegmentSynthesizer,
        publisher: Option<Publisher>,
    ) -> Self {
        Self {
            store,
            topics,
            scripts,
            synthesizer,
            assembler: TrackAssembler::default(),
            publisher,
            language: crate::defaults::TTS_LANGUAGE.to_string(),
            encoder: Mp3Encoder::default(),
            bitrate_kbps: crate::defaults::MP3_BITRATE_KBPS,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.publisher.is_none()
    }

    /// Produce and publish one episode stamped with the current time.
    pub async fn run_once(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Produce one episode stamped `now`.
    ///
    /// Holds the store lock for the whole run so two runs never publish into
    /// one store concurrently.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let _lock = match &self.publisher {
            Some(_) => Some(self.store.lock()?),
            None => None,
        };

        let topic = self.topics.pick().await;
        let episode = self.scripts.generate(&topic).await;

        let script_path = match &self.publisher {
            Some(_) => {
                let path = self.store.put_script(&episode.script, now)?;
                info!(path = %path.display(), "Script archived");
                Some(path)
            }
            None => None,
        };

        let segments = segment(&episode.script)?;
        let clips = self
            .synthesizer
            .synthesize_all(&segments, &self.language)
            .await?;
        let track = self.assembler.assemble(clips)?;
        let duration = track.duration();

        let output = match &self.publisher {
            Some(_) => {
                std::fs::create_dir_all(self.store.dir())?;
                self.store.path_of(&episode_filename(now))
            }
            None => std::env::temp_dir().join(episode_filename(now)).with_extension("wav"),
        };

        let (encoder, bitrate) = (self.encoder, self.bitrate_kbps);
        let export_path = output.clone();
        tokio::task::spawn_blocking(move || track.export(&export_path, encoder, bitrate))
            .await
            .map_err(|e| BriefcastError::Assembly {
                message: format!("Export task panicked: {}", e),
            })??;

        let episode_path = match &self.publisher {
            Some(publisher) => {
                publisher
                    .publish(&output, &episode.title, &episode.description)
                    .await?
            }
            None => output,
        };

        info!(
            title = %episode.title,
            episode = %episode_path.display(),
            segments = segments.len(),
            seconds = duration.as_secs(),
            "Run complete"
        );

        Ok(RunReport {
            topic: episode.topic,
            title: episode.title,
            episode: episode_path,
            script: script_path,
            segments: segments.len(),
            duration,
        })
    }
}

/// Publisher for the configured store, feed and optional GitHub mirror.
pub fn build_publisher(config: &Config, store: EpisodeStore) -> Result<Publisher> {
    let feed = FeedBuilder::new(
        store.clone(),
        config.channel.clone(),
        config.store.base_url.clone(),
        config.store.feed_path.clone(),
    );
    let publisher = Publisher::new(store, feed).with_upload_timeout(config.upload.timeout());

    #[cfg(feature = "http")]
    if let Some(uploader) = crate::publish::github::GithubReleaseUploader::from_config(&config.upload)? {
        info!(repo = ?config.upload.github_repo, "Mirroring episodes to GitHub releases");
        return Ok(publisher.with_uploader(Arc::new(uploader)));
    }

    Ok(publisher)
}

/// Run once with a runner built from `config`.
pub async fn run_once(config: &Config, dry_run: bool) -> Result<RunReport> {
    Runner::from_config(config, dry_run)?.run_once().await
}

/// Parse a local wall-clock time such as `06:00`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| BriefcastError::ConfigInvalidValue {
        key: "schedule.at".to_string(),
        message: format!("'{}' is not HH:MM ({})", s, e),
    })
}

/// Next instant strictly after `now` whose local time is `at`.
///
/// Days on which `at` does not exist locally (DST gaps) are skipped.
pub fn next_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    for _ in 0..4 {
        if let Some(candidate) = day.and_time(at).and_local_timezone(tz.clone()).earliest()
            && candidate > *now
        {
            return candidate;
        }
        day = day.succ_opt().unwrap_or(day);
    }
    now.clone() + chrono::Duration::days(1)
}

/// Run every day at local time `at`, forever.
///
/// A failed run is logged and the schedule continues.
pub async fn run_daily(config: &Config, at: NaiveTime, dry_run: bool) -> Result<()> {
    let runner = Runner::from_config(config, dry_run)?;
    info!(%at, dry_run, version = %crate::version_string(), "Scheduler started");

    loop {
        let now = Local::now();
        let next = next_occurrence(&now, at);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next = %next.format("%Y-%m-%d %H:%M %Z"), "Waiting for next run");
        tokio::time::sleep(wait).await;

        match runner.run_once().await {
            Ok(report) => info!(title = %report.title, episode = %report.episode.display(), "Scheduled run finished"),
            Err(e) => error!(stage = e.stage(), error = %e, "Scheduled run failed"),
        }
    }
}
