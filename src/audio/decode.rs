//! Compressed audio decoding using symphonia.
//!
//! Speech backends that return MP3 (the translate endpoint) are decoded here
//! into an [`AudioClip`]. Every sample format symphonia produces is converted
//! to interleaved f32 and downmixed to mono.

use crate::audio::clip::{AudioClip, downmix};
use crate::error::{BriefcastError, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Decode an in-memory audio file.
///
/// `extension` is a probe hint (e.g. `"mp3"`); the container is still sniffed.
pub fn decode_bytes(bytes: Vec<u8>, extension: &str) -> Result<AudioClip> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BriefcastError::AudioDecode {
            message: format!("Unrecognized audio container: {}", e),
        })?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| BriefcastError::AudioDecode {
            message: "No audio track found".to_string(),
        })?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| BriefcastError::AudioDecode {
            message: format!("Unsupported codec: {}", e),
        })?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(BriefcastError::AudioDecode {
                    message: format!("Failed to read packet: {}", e),
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                mono.extend(downmix(buffer.samples(), spec.channels.count()));
            }
            // A corrupt frame is skipped, not fatal
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = %e, "Skipping undecodable audio packet");
            }
            Err(e) => {
                return Err(BriefcastError::AudioDecode {
                    message: format!("Decoder failed: {}", e),
                });
            }
        }
    }

    if sample_rate == 0 {
        return Err(BriefcastError::AudioDecode {
            message: "Stream has no sample rate".to_string(),
        });
    }

    Ok(AudioClip::new(mono, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_bytes(vec![0u8; 64], "mp3");
        assert!(matches!(result, Err(BriefcastError::AudioDecode { .. })));
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(decode_bytes(Vec::new(), "mp3").is_err());
    }
}
