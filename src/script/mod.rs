//! Script handling: splitting text into speakable segments.

pub mod segmenter;

pub use segmenter::{Segment, segment};
