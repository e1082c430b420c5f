//! Decoded mono audio buffers and WAV I/O.

use crate::error::{BriefcastError, Result};
use std::io::{Read, Seek, Write};
use std::time::Duration;

/// Decoded mono audio: f32 samples in [-1.0, 1.0] at `sample_rate` Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Digital silence of the given length.
    pub fn silence(duration_ms: u32, sample_rate: u32) -> Self {
        let len = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = self.samples.len() as u128 * 1_000_000_000 / self.sample_rate as u128;
        Duration::from_nanos(nanos as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append another clip, converting its rate to ours first.
    pub fn extend(&mut self, other: &AudioClip) {
        if other.sample_rate == self.sample_rate {
            self.samples.extend_from_slice(&other.samples);
        } else {
            self.samples
                .extend(resample(&other.samples, other.sample_rate, self.sample_rate));
        }
    }

    /// Return this clip at `rate` Hz.
    pub fn resampled(self, rate: u32) -> Self {
        if self.sample_rate == rate {
            return self;
        }
        let samples = resample(&self.samples, self.sample_rate, rate);
        Self::new(samples, rate)
    }

    /// Parse WAV data of any channel count and sample format, downmixing to mono.
    pub fn from_wav_reader<R: Read>(reader: R) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| {
            BriefcastError::AudioDecode {
                message: format!("Failed to parse WAV data: {}", e),
            }
        })?;

        let spec = wav_reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                wav_reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(|e| BriefcastError::AudioDecode {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        Ok(Self::new(
            downmix(&interleaved, spec.channels as usize),
            spec.sample_rate,
        ))
    }

    /// Parse an in-memory WAV file.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_wav_reader(std::io::Cursor::new(bytes))
    }

    /// Write the clip as 16-bit mono PCM WAV.
    pub fn write_wav<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let wav_err = |e: hound::Error| BriefcastError::Other(format!("WAV write failed: {}", e));

        let mut wav_writer = hound::WavWriter::new(writer, spec).map_err(wav_err)?;
        for &sample in &self.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            wav_writer.write_sample(value).map_err(wav_err)?;
        }
        wav_writer.finalize().map_err(wav_err)
    }
}

/// Average interleaved frames down to a single channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx];
                let right = samples[source_idx + 1];
                left + (right - left) * fraction
            }
        })
        .collect()
}
