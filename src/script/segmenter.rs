//! Script segmentation.
//!
//! Splits a Host/Guest script into the units handed to the speech backend.
//! Blank lines close a paragraph; a line starting with a speaker label is
//! always a unit of its own. A label on its own line is *not* merged with the
//! dialogue that follows it.

use crate::error::{BriefcastError, Result};

/// Speaker labels that start a new utterance.
pub const SPEAKER_LABELS: [&str; 2] = ["Host:", "Guest:"];

/// One unit of script text scheduled for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 1-based position in playback order.
    pub index: usize,
    pub text: String,
}

/// Returns true if the (trimmed) line opens with a speaker label.
pub fn is_speaker_line(line: &str) -> bool {
    SPEAKER_LABELS.iter().any(|label| line.starts_with(label))
}

/// Split `script` into ordered, non-empty segments.
///
/// # Errors
/// Returns [`BriefcastError::EmptyScript`] when nothing speakable remains.
pub fn segment(script: &str) -> Result<Vec<Segment>> {
    let mut texts: Vec<String> = Vec::new();
    let mut buffered: Vec<&str> = Vec::new();

    for line in script.lines().map(str::trim) {
        if line.is_empty() {
            flush(&mut buffered, &mut texts);
            continue;
        }

        if is_speaker_line(line) {
            flush(&mut buffered, &mut texts);
            texts.push(line.to_string());
            continue;
        }

        buffered.push(line);
    }
    flush(&mut buffered, &mut texts);

    if texts.is_empty() {
        return Err(BriefcastError::EmptyScript);
    }

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Segment { index: i + 1, text })
        .collect())
}

fn flush(buffered: &mut Vec<&str>, texts: &mut Vec<String>) {
    if !buffered.is_empty() {
        texts.push(buffered.join(" "));
        buffered.clear();
    }
}
