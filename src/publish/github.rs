//! Mirror episode audio to a GitHub release.
//!
//! Assets go to the release with the configured tag, which is created on
//! first use. The asset's public download URL becomes the enclosure URL.
//! Republishing a filename replaces the asset of the same name.

use crate::config::UploadConfig;
use crate::defaults;
use crate::error::{BriefcastError, Result};
use crate::publish::publisher::AssetUploader;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};

const API_BASE: &str = "https://api.github.com";
const UPLOADS_BASE: &str = "https://uploads.github.com";
const USER_AGENT: &str = concat!("briefcast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    id: u64,
    name: String,
}

impl Release {
    /// Id of the asset already uploaded under `name`, if any.
    fn asset_named(&self, name: &str) -> Option<u64> {
        self.assets.iter().find(|a| a.name == name).map(|a| a.id)
    }
}

#[derive(Debug, Deserialize)]
struct Asset {
    browser_download_url: Option<String>,
}

pub struct GithubReleaseUploader {
    http: Client,
    token: String,
    repo: String,
    tag: String,
}

impl GithubReleaseUploader {
    pub fn new(token: &str, repo: &str, tag: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BriefcastError::Upload {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            token: token.to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Uploader for the configured repository, or `None` when token or
    /// repository is missing.
    pub fn from_config(config: &UploadConfig) -> Result<Option<Self>> {
        match config.github_credentials() {
            Some((token, repo)) => Ok(Some(Self::new(token, repo, &config.release_tag)?)),
            None => Ok(None),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    async fn find_or_create_release(&self) -> Result<Release> {
        let resp = self
            .request(self.http.get(release_by_tag_url(&self.repo, &self.tag)))
            .timeout(defaults::HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|e| upload_err(format!("Release lookup failed: {e}")))?;

        if resp.status().is_success() {
            let release: Release = resp
                .json()
                .await
                .map_err(|e| upload_err(format!("Failed to parse release: {e}")))?;
            debug!(release = release.id, tag = %self.tag, "Found release");
            return Ok(release);
        }
        if resp.status() != StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(upload_err(format!(
                "Release lookup returned {status}: {body}"
            )));
        }

        let body = json!({
            "tag_name": self.tag,
            "name": self.tag,
            "draft": false,
            "prerelease": false,
        });
        let resp = self
            .request(self.http.post(releases_url(&self.repo)))
            .timeout(defaults::HTTP_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| upload_err(format!("Release creation failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(upload_err(format!(
                "Release creation returned {status}: {body}"
            )));
        }
        let release: Release = resp
            .json()
            .await
            .map_err(|e| upload_err(format!("Failed to parse release: {e}")))?;
        info!(release = release.id, tag = %self.tag, repo = %self.repo, "Created release");
        Ok(release)
    }

    async fn delete_asset(&self, asset_id: u64) -> Result<()> {
        let resp = self
            .request(self.http.delete(asset_url(&self.repo, asset_id)))
            .timeout(defaults::HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|e| upload_err(format!("Asset deletion failed: {e}")))?;

        // Already gone is as good as deleted
        if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(upload_err(format!("Asset deletion returned {status}: {body}")))
    }
}

#[async_trait]
impl AssetUploader for GithubReleaseUploader {
    async fn upload(&self, path: &Path) -> Result<Option<String>> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| upload_err(format!("{} has no file name", path.display())))?;
        let bytes = tokio::fs::read(path).await?;

        let release = self.find_or_create_release().await?;
        if let Some(asset_id) = release.asset_named(&filename) {
            debug!(asset = asset_id, name = %filename, "Replacing existing asset");
            self.delete_asset(asset_id).await?;
        }
        let url = asset_upload_url(&self.repo, release.id, &filename)?;

        let resp = self
            .request(self.http.post(url))
            .timeout(defaults::UPLOAD_REQUEST_TIMEOUT)
            .header("Content-Type", defaults::AUDIO_MIME)
            .body(bytes)
            .send()
            .await
            .map_err(|e| upload_err(format!("Asset upload failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(upload_err(format!("Asset upload returned {status}: {body}")));
        }

        let asset: Asset = resp
            .json()
            .await
            .map_err(|e| upload_err(format!("Failed to parse asset: {e}")))?;
        Ok(asset.browser_download_url)
    }

    fn name(&self) -> &str {
        "github-releases"
    }
}

fn release_by_tag_url(repo: &str, tag: &str) -> String {
    format!("{}/repos/{}/releases/tags/{}", API_BASE, repo, tag)
}

fn releases_url(repo: &str) -> String {
    format!("{}/repos/{}/releases", API_BASE, repo)
}

fn asset_url(repo: &str, asset_id: u64) -> String {
    format!("{}/repos/{}/releases/assets/{}", API_BASE, repo, asset_id)
}

fn asset_upload_url(repo: &str, release_id: u64, filename: &str) -> Result<reqwest::Url> {
    let base = format!("{}/repos/{}/releases/{}/assets", UPLOADS_BASE, repo, release_id);
    reqwest::Url::parse_with_params(&base, &[("name", filename)])
        .map_err(|e| upload_err(format!("Invalid upload URL: {e}")))
}

fn upload_err(message: String) -> BriefcastError {
    BriefcastError::Upload { message }
}
