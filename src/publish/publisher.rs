//! Episode publishing: store the audio, mirror it remotely when configured,
//! record metadata, rebuild the feed.

use crate::error::Result;
use crate::publish::feed::FeedBuilder;
use crate::publish::store::EpisodeStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A remote place episode audio can be mirrored to.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload `path`, returning its public URL if the store provides one.
    async fn upload(&self, path: &Path) -> Result<Option<String>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

pub struct Publisher {
    store: EpisodeStore,
    feed: FeedBuilder,
    uploader: Option<Arc<dyn AssetUploader>>,
    upload_timeout: Duration,
}

impl Publisher {
    pub fn new(store: EpisodeStore, feed: FeedBuilder) -> Self {
        Self {
            store,
            feed,
            uploader: None,
            upload_timeout: Duration::from_secs(crate::defaults::UPLOAD_TIMEOUT_SECS),
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn AssetUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn store(&self) -> &EpisodeStore {
        &self.store
    }

    pub fn feed(&self) -> &FeedBuilder {
        &self.feed
    }

    /// Publish `local_audio` as an episode and return its path in the store.
    ///
    /// Upload problems never fail a publish; the episode is then served from
    /// the store's base URL.
    ///
    /// # Errors
    /// `Publish` if the audio or its metadata cannot be stored, `Feed` if the
    /// feed cannot be rewritten.
    pub async fn publish(
        &self,
        local_audio: &Path,
        title: &str,
        description: &str,
    ) -> Result<PathBuf> {
        let stored = self.store.put(local_audio)?;
        let remote_url = self.upload(&stored).await;
        self.store
            .put_metadata(&stored, title, description, remote_url.as_deref())?;
        let feed_path = self.feed.build()?;

        info!(
            episode = %stored.display(),
            feed = %feed_path.display(),
            remote = remote_url.as_deref().unwrap_or("none"),
            "Episode published"
        );
        Ok(stored)
    }

    async fn upload(&self, stored: &Path) -> Option<String> {
        let uploader = self.uploader.as_ref()?;
        match tokio::time::timeout(self.upload_timeout, uploader.upload(stored)).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                warn!(uploader = uploader.name(), error = %e, "Upload failed, serving from store");
                None
            }
            Err(_) => {
                warn!(
                    uploader = uploader.name(),
                    timeout = ?self.upload_timeout,
                    "Upload timed out, serving from store"
                );
                None
            }
        }
    }
}
