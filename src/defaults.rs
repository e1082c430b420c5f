//! Default configuration constants for briefcast.
//!
//! Shared by the config layer and the pipeline components so the two never
//! drift apart.

use std::time::Duration;

/// Default episode store directory, relative to the working directory.
pub const EPISODES_DIR: &str = "episodes";

/// Default output path of the feed document.
pub const FEED_PATH: &str = "podcast.xml";

/// Default public base URL for locally served audio.
pub const BASE_URL: &str = "http://localhost:8000";

/// Default channel title.
pub const PODCAST_TITLE: &str = "Automated Daily Brief";

/// Default channel description.
pub const PODCAST_DESCRIPTION: &str = "Automatically generated news briefings.";

/// Default iTunes category.
pub const PODCAST_CATEGORY: &str = "News";

/// Default channel language.
pub const PODCAST_LANGUAGE: &str = "en";

/// MIME type of every enclosure in the feed.
pub const AUDIO_MIME: &str = "audio/mpeg";

/// Extension of audio files kept in the episode store.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Extension of metadata sidecars.
pub const SIDECAR_EXTENSION: &str = "json";

/// Prefix of generated episode filenames.
pub const EPISODE_PREFIX: &str = "episode_";

/// Prefix of archived script filenames.
pub const SCRIPT_PREFIX: &str = "script_";

/// UTC timestamp layout embedded in generated filenames.
///
/// Zero-padded, so lexicographic filename order is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Speech language passed to the synthesizer.
pub const TTS_LANGUAGE: &str = "en";

/// Attempts per segment before synthesis gives up.
pub const MAX_SYNTHESIS_ATTEMPTS: u32 = 3;

/// Fixed wait between synthesis attempts, in milliseconds.
pub const RETRY_BACKOFF_MS: u64 = 2000;

/// Silence appended after every segment, in milliseconds.
pub const SEGMENT_SILENCE_MS: u32 = 300;

/// Segments synthesized at once. 1 keeps synthesis strictly sequential.
pub const MAX_CONCURRENT_SEGMENTS: usize = 1;

/// Peak level the assembled track is normalized to, in dBFS.
pub const NORMALIZE_HEADROOM_DB: f32 = 0.1;

/// MP3 bitrate used by the external encoder.
pub const MP3_BITRATE_KBPS: u32 = 128;

/// Release tag that receives uploaded assets.
pub const RELEASE_TAG: &str = "automated";

/// Overall bound on a remote upload, in seconds.
pub const UPLOAD_TIMEOUT_SECS: u64 = 180;

/// Target episode length handed to the script generator.
pub const EPISODE_MINUTES: u32 = 8;

/// Topic used whenever the topic source has nothing to offer.
pub const FALLBACK_TOPIC: &str = "latest global technology trends";

/// Name of the single-run lock file inside the episode store.
pub const LOCK_FILE: &str = ".briefcast.lock";

/// Timeout for small HTTP metadata calls.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for large asset uploads.
pub const UPLOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
