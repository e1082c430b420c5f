//! Track assembly: stitch per-segment clips into one normalized track.

use crate::audio::clip::AudioClip;
use crate::audio::encoder::{Mp3Encoder, encode_mp3};
use crate::defaults;
use crate::error::{BriefcastError, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// The assembled, normalized audio of one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Track(AudioClip);

impl Track {
    pub fn duration(&self) -> Duration {
        self.0.duration()
    }

    pub fn sample_rate(&self) -> u32 {
        self.0.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.0.samples
    }

    /// Write the track to `path`.
    ///
    /// `.wav` is written directly; any other extension is encoded to MP3 with
    /// `encoder`. Missing parent directories are created.
    pub fn export(&self, path: &Path, encoder: Mp3Encoder, bitrate_kbps: u32) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| BriefcastError::Assembly {
                message: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

        if is_wav {
            let file = fs::File::create(path).map_err(|e| BriefcastError::Assembly {
                message: format!("Failed to create {}: {}", path.display(), e),
            })?;
            self.0.write_wav(std::io::BufWriter::new(file))?;
        } else {
            encode_mp3(&self.0, path, encoder, bitrate_kbps)?;
        }

        info!(
            path = %path.display(),
            seconds = self.duration().as_secs_f32(),
            "Track exported"
        );
        Ok(())
    }
}

/// Concatenates clips with trailing silence and normalizes the result.
#[derive(Debug, Clone)]
pub struct TrackAssembler {
    /// Silence appended after every clip, including the last.
    pub silence_ms: u32,
    /// Target peak below full scale, in dB.
    pub headroom_db: f32,
}

impl Default for TrackAssembler {
    fn default() -> Self {
        Self {
            silence_ms: defaults::SEGMENT_SILENCE_MS,
            headroom_db: defaults::NORMALIZE_HEADROOM_DB,
        }
    }
}

impl TrackAssembler {
    pub fn new(silence_ms: u32) -> Self {
        Self {
            silence_ms,
            ..Self::default()
        }
    }

    /// Stitch `clips` in order into one track.
    ///
    /// Clips at different rates are converted to the highest rate present.
    /// Normalization runs once over the whole buffer so relative segment
    /// loudness is kept.
    ///
    /// # Errors
    /// [`BriefcastError::Assembly`] when `clips` is empty.
    pub fn assemble(&self, clips: Vec<AudioClip>) -> Result<Track> {
        let rate = clips
            .iter()
            .map(|c| c.sample_rate)
            .max()
            .ok_or_else(|| BriefcastError::Assembly {
                message: "no audio clips to assemble".to_string(),
            })?;

        let silence = AudioClip::silence(self.silence_ms, rate);
        let capacity = clips
            .iter()
            .map(|c| c.samples.len() * rate as usize / c.sample_rate.max(1) as usize)
            .sum::<usize>()
            + silence.samples.len() * clips.len();

        let mut track = AudioClip::new(Vec::with_capacity(capacity), rate);
        for clip in &clips {
            track.extend(clip);
            track.extend(&silence);
        }

        normalize(&mut track.samples, self.headroom_db);
        Ok(Track(track))
    }
}

/// Scale `samples` so the absolute peak sits `headroom_db` below full scale.
///
/// Silent buffers are left alone.
pub fn normalize(samples: &mut [f32], headroom_db: f32) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }
    let target = 10f32.powf(-headroom_db / 20.0);
    let gain = target / peak;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// `episode_<YYYYMMDDTHHMMSSZ>.mp3` for the given instant.
pub fn episode_filename(now: DateTime<Utc>) -> String {
    format!(
        "{}{}.{}",
        defaults::EPISODE_PREFIX,
        now.format(defaults::TIMESTAMP_FORMAT),
        defaults::AUDIO_EXTENSION
    )
}

/// Generated output path under `dir`, creating `dir` if needed.
pub fn episode_path(dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(episode_filename(now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tone(seconds: f32, rate: u32, amplitude: f32) -> AudioClip {
        let len = (seconds * rate as f32) as usize;
        let samples = (0..len)
            .map(|i| amplitude * ((i as f32) * 0.05).sin())
            .collect();
        AudioClip::new(samples, rate)
    }

    #[test]
    fn test_empty_input_fails() {
        let result = TrackAssembler::default().assemble(Vec::new());
        assert!(matches!(result, Err(BriefcastError::Assembly { .. })));
    }

    #[test]
    fn test_duration_includes_trailing_silence_per_segment() {
        let clips = vec![tone(1.0, 16000, 0.3), tone(0.5, 16000, 0.3)];
        let track = TrackAssembler::default().assemble(clips).unwrap();

        // 1.0 + 0.3 + 0.5 + 0.3
        assert_eq!(track.samples().len(), 33600);
        assert_eq!(track.duration(), Duration::from_millis(2100));
    }

    #[test]
    fn test_single_segment_still_gets_silence() {
        let track = TrackAssembler::default()
            .assemble(vec![tone(0.2, 10000, 0.5)])
            .unwrap();
        assert_eq!(track.samples().len(), 2000 + 3000);
        assert!(track.samples()[2000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_mixed_rates_use_highest() {
        let clips = vec![tone(1.0, 16000, 0.3), tone(1.0, 24000, 0.3)];
        let track = TrackAssembler::default().assemble(clips).unwrap();

        assert_eq!(track.sample_rate(), 24000);
        let secs = track.duration().as_secs_f64();
        assert!((secs - 2.6).abs() < 0.01, "got {secs}");
    }

    #[test]
    fn test_normalization_is_global() {
        let quiet = AudioClip::new(vec![0.1; 100], 1000);
        let loud = AudioClip::new(vec![0.4; 100], 1000);
        let track = TrackAssembler::new(0).assemble(vec![quiet, loud]).unwrap();

        let target = 10f32.powf(-0.1 / 20.0);
        let samples = track.samples();
        assert!((samples[150] - target).abs() < 1e-5);
        // Relative loudness preserved: quiet segment is a quarter of the loud one
        assert!((samples[50] - target / 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_leaves_silence_alone() {
        let mut samples = vec![0.0f32; 10];
        normalize(&mut samples, 0.1);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_segment_order_is_preserved() {
        let first = AudioClip::new(vec![0.5; 10], 1000);
        let second = AudioClip::new(vec![-0.5; 10], 1000);
        let track = TrackAssembler::new(0).assemble(vec![first, second]).unwrap();

        assert!(track.samples()[..10].iter().all(|&s| s > 0.0));
        assert!(track.samples()[10..].iter().all(|&s| s < 0.0));
    }

    #[test]
    fn test_episode_filename_format() {
        let now = Utc.with_ymd_and_hms(2026, 1, 6, 5, 24, 19).unwrap();
        assert_eq!(episode_filename(now), "episode_20260106T052419Z.mp3");
    }

    #[test]
    fn test_episode_path_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("episodes");
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let path = episode_path(&dir, now).unwrap();

        assert!(dir.is_dir());
        assert_eq!(path, dir.join("episode_20260301T000000Z.mp3"));
    }

    #[test]
    fn test_export_wav_round_trips_length() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("track.wav");
        let track = TrackAssembler::default()
            .assemble(vec![tone(0.5, 16000, 0.2)])
            .unwrap();

        track.export(&path, Mp3Encoder::Ffmpeg, 128).unwrap();

        let bytes = fs::read(&path).unwrap();
        let back = AudioClip::from_wav_bytes(&bytes).unwrap();
        assert_eq!(back.samples.len(), track.samples().len());
        assert_eq!(back.sample_rate, 16000);
    }
}
