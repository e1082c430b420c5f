//! Episode store, feed generation and publishing.

pub mod feed;
#[cfg(feature = "http")]
pub mod github;
pub mod publisher;
pub mod store;

pub use feed::{Enclosure, Feed, FeedBuilder, FeedEntry, parse_episode_timestamp};
pub use publisher::{AssetUploader, Publisher};
pub use store::{EpisodeMetadata, EpisodeStore, StoreLock};
