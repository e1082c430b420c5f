//! Audio buffers, codecs and track assembly.

pub mod assembler;
pub mod clip;
pub mod decode;
pub mod encoder;

pub use assembler::{Track, TrackAssembler, episode_filename, episode_path};
pub use clip::AudioClip;
pub use encoder::Mp3Encoder;
