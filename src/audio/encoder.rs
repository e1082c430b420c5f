//! MP3 encoding through an external encoder binary.
//!
//! The track is written to a temporary WAV next to the destination and handed
//! to `ffmpeg` or `lame`. The temporary WAV is removed whatever the outcome,
//! and the destination only appears once encoding has succeeded.

use crate::audio::clip::AudioClip;
use crate::error::{BriefcastError, Result};
use crate::sys;
use serde::{Deserialize, Serialize};
use std::io::BufWriter;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// External MP3 encoder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mp3Encoder {
    #[default]
    Ffmpeg,
    Lame,
}

impl Mp3Encoder {
    /// Executable name looked up on PATH.
    pub fn program(&self) -> &'static str {
        match self {
            Mp3Encoder::Ffmpeg => "ffmpeg",
            Mp3Encoder::Lame => "lame",
        }
    }

    /// Arguments that encode `input` (WAV) into `output` (MP3).
    pub fn args(&self, input: &Path, output: &Path, bitrate_kbps: u32) -> Vec<String> {
        let input = input.to_string_lossy().into_owned();
        let output = output.to_string_lossy().into_owned();
        match self {
            Mp3Encoder::Ffmpeg => vec![
                "-y".into(),
                "-loglevel".into(),
                "error".into(),
                "-i".into(),
                input,
                "-codec:a".into(),
                "libmp3lame".into(),
                "-b:a".into(),
                format!("{}k", bitrate_kbps),
                // Output is staged under a non-audio name
                "-f".into(),
                "mp3".into(),
                output,
            ],
            Mp3Encoder::Lame => vec![
                "--quiet".into(),
                "-b".into(),
                bitrate_kbps.to_string(),
                input,
                output,
            ],
        }
    }
}

impl std::str::FromStr for Mp3Encoder {
    type Err = BriefcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ffmpeg" => Ok(Mp3Encoder::Ffmpeg),
            "lame" => Ok(Mp3Encoder::Lame),
            other => Err(BriefcastError::ConfigInvalidValue {
                key: "tts.encoder".to_string(),
                message: format!("unknown encoder '{}' (expected ffmpeg or lame)", other),
            }),
        }
    }
}

/// Encode `clip` to an MP3 file at `output`.
///
/// The encoder writes to a hidden `.part` file next to `output`, which is
/// renamed over `output` only once the encoder succeeds. A failed or
/// interrupted encode leaves nothing at `output`.
pub fn encode_mp3(
    clip: &AudioClip,
    output: &Path,
    encoder: Mp3Encoder,
    bitrate_kbps: u32,
) -> Result<()> {
    encode_with(clip, output, encoder.program(), |input, out| {
        encoder.args(input, out, bitrate_kbps)
    })
}

fn encode_with(
    clip: &AudioClip,
    output: &Path,
    program: &str,
    args: impl Fn(&Path, &Path) -> Vec<String>,
) -> Result<()> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let assembly_err = |e: std::io::Error| BriefcastError::Assembly {
        message: format!("Failed to stage {}: {}", output.display(), e),
    };

    let wav = sys::staging_file(dir, ".wav", None).map_err(assembly_err)?;
    clip.write_wav(BufWriter::new(wav.as_file()))?;
    let part = sys::staging_file(dir, ".part", sys::shared_permissions().as_ref())
        .map_err(assembly_err)?;

    let argv = args(wav.path(), part.path());
    debug!(program, ?argv, "Encoding MP3");

    let result = Command::new(program)
        .args(&argv)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();

    if let Err(e) = wav.close() {
        warn!(error = %e, "Failed to remove temporary WAV");
    }

    let out = result.map_err(|e| BriefcastError::Assembly {
        message: format!("Failed to run {}: {}", program, e),
    })?;
    if !out.status.success() {
        // Dropping `part` removes the partial output
        return Err(BriefcastError::Assembly {
            message: format!(
                "{} exited with {}: {}",
                program,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        });
    }

    part.persist(output).map_err(|e| assembly_err(e.error))?;
    Ok(())
}
