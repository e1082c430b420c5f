//! End-to-end checks across segmenting, synthesis, assembly and publishing.
//!
//! Everything here runs offline: speech comes from the mock backends and the
//! "episodes" handed to the publisher are WAV exports or stand-in files.

use briefcast::audio::{AudioClip, Mp3Encoder, TrackAssembler};
use briefcast::config::ChannelConfig;
use briefcast::publish::{EpisodeStore, FeedBuilder, Publisher};
use briefcast::script::segment;
use briefcast::tts::synthesizer::{FlakySynthesizer, MockSynthesizer};
use briefcast::tts::{RetryPolicy, SegmentSynthesizer, SpeechSynthesizer};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SCRIPT: &str = "\
Host: Welcome to the daily brief.
Guest: Thanks for having me.

Today we look at ownership,
borrowing and lifetimes.

Host: That's all for today.
";

const BASE_URL: &str = "https://example.org/pod";

fn publisher_for(root: &Path) -> Publisher {
    let store = EpisodeStore::new(root.join("episodes"));
    let channel = ChannelConfig {
        title: "Test Brief".to_string(),
        ..ChannelConfig::default()
    };
    let feed = FeedBuilder::new(store.clone(), channel, BASE_URL, root.join("feed.xml"));
    Publisher::new(store, feed)
}

fn fake_episode(dir: &Path, name: &str, bytes: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![0xFFu8; bytes]).unwrap();
    path
}

fn no_backoff() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: Duration::ZERO,
    }
}

#[tokio::test]
async fn script_to_wav_keeps_segment_order() {
    let dir = tempfile::tempdir().unwrap();
    let segments = segment(SCRIPT).unwrap();
    assert_eq!(segments.len(), 4);
    assert_eq!(
        segments[2].text,
        "Today we look at ownership, borrowing and lifetimes."
    );

    let backend: Arc<dyn SpeechSynthesizer> = Arc::new(MockSynthesizer::new());
    let synthesizer = SegmentSynthesizer::new(backend)
        .with_policy(no_backoff())
        .with_max_concurrent(3);
    let clips = synthesizer.synthesize_all(&segments, "en").await.unwrap();

    let expected: Vec<AudioClip> = segments
        .iter()
        .map(|s| MockSynthesizer::clip_for(&s.text))
        .collect();
    assert_eq!(clips, expected);

    let track = TrackAssembler::new(250).assemble(clips).unwrap();
    let speech: usize = expected.iter().map(|c| c.samples.len()).sum();
    let silence = 4 * (track.sample_rate() as usize / 4);
    assert_eq!(track.samples().len(), speech + silence);

    let out = dir.path().join("nested").join("episode.wav");
    track.export(&out, Mp3Encoder::default(), 128).unwrap();

    let reader = hound::WavReader::open(&out).unwrap();
    assert_eq!(reader.spec().sample_rate, track.sample_rate());
    assert_eq!(reader.len() as usize, track.samples().len());
}

#[tokio::test]
async fn transient_backend_failures_are_invisible_to_the_track() {
    let segments = segment(SCRIPT).unwrap();

    let flaky = Arc::new(FlakySynthesizer::new("ownership", 2));
    let synthesizer = SegmentSynthesizer::new(flaky.clone()).with_policy(no_backoff());
    let clips = synthesizer.synthesize_all(&segments, "en").await.unwrap();

    let steady: Arc<dyn SpeechSynthesizer> = Arc::new(MockSynthesizer::new());
    let reference = SegmentSynthesizer::new(steady)
        .synthesize_all(&segments, "en")
        .await
        .unwrap();

    assert_eq!(clips, reference);
    assert_eq!(flaky.calls(), segments.len() as u32 + 2);
}

#[tokio::test]
async fn exhausted_retries_name_the_failing_segment() {
    let segments = segment(SCRIPT).unwrap();
    let flaky: Arc<dyn SpeechSynthesizer> = Arc::new(FlakySynthesizer::new("lifetimes", 5));
    let synthesizer = SegmentSynthesizer::new(flaky).with_policy(no_backoff());

    let err = synthesizer
        .synthesize_all(&segments, "en")
        .await
        .unwrap_err();
    match err {
        briefcast::BriefcastError::Synthesis { segment_index, .. } => {
            assert_eq!(segment_index, 3)
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn publishing_episodes_rebuilds_the_feed_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = publisher_for(dir.path());

    let first = fake_episode(dir.path(), "episode_20260105T060000Z.mp3", 100);
    let second = fake_episode(dir.path(), "episode_20260106T060000Z.mp3", 250);

    publisher
        .publish(&first, "Monday <Brief>", "About & around")
        .await
        .unwrap();
    publisher.publish(&second, "Tuesday", "").await.unwrap();

    let xml = fs::read_to_string(dir.path().join("feed.xml")).unwrap();
    let tuesday = xml.find("<title>Tuesday</title>").unwrap();
    let monday = xml.find("<title>Monday &lt;Brief&gt;</title>").unwrap();
    assert!(tuesday < monday, "newest episode must come first");
    assert!(xml.contains("About &amp; around"));
    assert!(xml.contains(&format!(
        "url=\"{}/episode_20260106T060000Z.mp3\" length=\"250\"",
        BASE_URL
    )));
    assert!(xml.contains("<pubDate>Tue, 6 Jan 2026 06:00:00 +0000</pubDate>"));
    assert!(xml.contains("<lastBuildDate>Tue, 6 Jan 2026 06:00:00 +0000</lastBuildDate>"));
    assert!(xml.contains("<title>Test Brief</title>"));

    let sidecar = dir
        .path()
        .join("episodes")
        .join("episode_20260105T060000Z.json");
    let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(sidecar).unwrap()).unwrap();
    assert_eq!(meta["title"], "Monday <Brief>");
    assert!(meta["mp3_url"].is_null());
}

#[tokio::test]
async fn republishing_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = publisher_for(dir.path());
    let audio = fake_episode(dir.path(), "episode_20260106T060000Z.mp3", 64);

    publisher.publish(&audio, "Same", "").await.unwrap();
    let once = fs::read(dir.path().join("feed.xml")).unwrap();
    publisher.publish(&audio, "Same", "").await.unwrap();
    let twice = fs::read(dir.path().join("feed.xml")).unwrap();

    assert_eq!(once, twice);
    assert_eq!(publisher.store().list_episodes().unwrap().len(), 1);
}

#[tokio::test]
async fn rebuilding_an_untouched_store_gives_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = publisher_for(dir.path());
    let audio = fake_episode(dir.path(), "episode_20260106T060000Z.mp3", 64);
    publisher.publish(&audio, "One", "first").await.unwrap();

    let before = fs::read(dir.path().join("feed.xml")).unwrap();
    publisher.feed().build().unwrap();
    let after = fs::read(dir.path().join("feed.xml")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn episodes_without_sidecars_still_reach_the_feed() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = publisher_for(dir.path());
    let episodes = dir.path().join("episodes");
    fs::create_dir_all(&episodes).unwrap();
    fake_episode(&episodes, "episode_20260101T000000Z.mp3", 10);

    publisher.feed().build().unwrap();
    let xml = fs::read_to_string(dir.path().join("feed.xml")).unwrap();
    assert!(xml.contains("<title>Episode: episode_20260101T000000Z.mp3</title>"));
    assert!(xml.contains("New automated episode (episode_20260101T000000Z.mp3)."));
}
