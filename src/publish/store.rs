//! The episode store: a flat directory of `<name>.mp3` files, each with a
//! `<name>.json` metadata sidecar.
//!
//! Every write goes to a temporary file inside the store and is renamed over
//! the destination, so readers never see a half-written episode. Stored files
//! are world-readable so a web server can serve them.

use crate::defaults;
use crate::error::{BriefcastError, Result};
use crate::sys;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Sidecar contents. Every field is optional so partial or hand-edited files
/// still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EpisodeMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mp3_path: Option<String>,
    pub mp3_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EpisodeStore {
    dir: PathBuf,
}

impl EpisodeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a stored file with this name lives at.
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| BriefcastError::Publish {
            cause: format!("Failed to create {}: {}", self.dir.display(), e),
        })
    }

    /// Copy `local_audio` into the store under its base name.
    ///
    /// Copying a file onto itself is a no-op.
    ///
    /// # Errors
    /// [`BriefcastError::Publish`] if the directory cannot be created or the
    /// copy fails.
    pub fn put(&self, local_audio: &Path) -> Result<PathBuf> {
        self.ensure_dir()?;

        let filename = local_audio
            .file_name()
            .ok_or_else(|| BriefcastError::Publish {
                cause: format!("{} has no file name", local_audio.display()),
            })?;
        let dest = self.dir.join(filename);

        if same_file(local_audio, &dest) {
            debug!(path = %dest.display(), "Audio already in store");
            return Ok(dest);
        }

        let mut source = fs::File::open(local_audio).map_err(|e| BriefcastError::Publish {
            cause: format!("Failed to open {}: {}", local_audio.display(), e),
        })?;
        let mut temp = self.staging_file().map_err(|e| publish_err(&dest, e))?;
        std::io::copy(&mut source, temp.as_file_mut()).map_err(|e| publish_err(&dest, e))?;
        temp.as_file().sync_all().map_err(|e| publish_err(&dest, e))?;
        temp.persist(&dest)
            .map_err(|e| publish_err(&dest, e.error))?;

        info!(path = %dest.display(), "Stored episode audio");
        Ok(dest)
    }

    /// Write the sidecar for `stored_audio`, replacing any previous one.
    ///
    /// # Errors
    /// [`BriefcastError::Publish`] if the sidecar cannot be written.
    pub fn put_metadata(
        &self,
        stored_audio: &Path,
        title: &str,
        description: &str,
        remote_url: Option<&str>,
    ) -> Result<PathBuf> {
        self.ensure_dir()?;

        let filename = stored_audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BriefcastError::Publish {
                cause: format!("{} has no file name", stored_audio.display()),
            })?;
        let metadata = EpisodeMetadata {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            mp3_path: Some(filename.clone()),
            mp3_url: remote_url.map(str::to_string),
        };
        let json = serde_json::to_string_pretty(&metadata).map_err(|e| BriefcastError::Publish {
            cause: format!("Failed to serialize metadata: {}", e),
        })?;

        let dest = self.sidecar_path(&filename);
        self.write_atomic(&dest, json.as_bytes())?;
        debug!(path = %dest.display(), remote = remote_url.is_some(), "Wrote episode metadata");
        Ok(dest)
    }

    /// Archive a generated script as `script_<timestamp>.txt`.
    pub fn put_script(&self, script: &str, now: DateTime<Utc>) -> Result<PathBuf> {
        self.ensure_dir()?;
        let dest = self.dir.join(format!(
            "{}{}.txt",
            defaults::SCRIPT_PREFIX,
            now.format(defaults::TIMESTAMP_FORMAT)
        ));
        self.write_atomic(&dest, script.as_bytes())?;
        Ok(dest)
    }

    /// Audio filenames in the store, ascending. A missing directory is empty.
    pub fn list_episodes(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_audio_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Sidecar for `filename`, or an empty record if it is missing or corrupt.
    pub fn load_metadata(&self, filename: &str) -> EpisodeMetadata {
        let path = self.sidecar_path(filename);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No episode metadata");
                return EpisodeMetadata::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable episode metadata");
                EpisodeMetadata::default()
            }
        }
    }

    /// Take the single-run lock for this store.
    ///
    /// # Errors
    /// [`BriefcastError::Publish`] if another run holds it.
    pub fn lock(&self) -> Result<StoreLock> {
        self.ensure_dir()?;
        StoreLock::acquire(self.dir.join(defaults::LOCK_FILE))
    }

    fn sidecar_path(&self, audio_filename: &str) -> PathBuf {
        self.dir
            .join(audio_filename)
            .with_extension(defaults::SIDECAR_EXTENSION)
    }

    /// Staging file for a write into the store, already carrying the mode
    /// the published file should have.
    fn staging_file(&self) -> std::io::Result<NamedTempFile> {
        sys::staging_file(&self.dir, ".tmp", sys::shared_permissions().as_ref())
    }

    fn write_atomic(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        let mut temp = self.staging_file().map_err(|e| publish_err(dest, e))?;
        temp.write_all(bytes).map_err(|e| publish_err(dest, e))?;
        temp.as_file().sync_all().map_err(|e| publish_err(dest, e))?;
        temp.persist(dest).map_err(|e| publish_err(dest, e.error))?;
        Ok(())
    }
}

/// Held while a run publishes into a store; the lock file is removed on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(path: PathBuf) -> Result<Self> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    BriefcastError::Publish {
                        cause: format!(
                            "store is locked by another run (remove {} if stale)",
                            path.display()
                        ),
                    }
                } else {
                    publish_err(&path, e)
                }
            })?;
        // Owner pid, for humans inspecting a stale lock
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            warn!(path = %path.display(), error = %e, "Failed to write lock owner");
        }
        debug!(path = %path.display(), "Store lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release store lock");
        }
    }
}

fn is_audio_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(defaults::AUDIO_EXTENSION))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn publish_err(path: &Path, e: std::io::Error) -> BriefcastError {
    BriefcastError::Publish {
        cause: format!("Failed to write {}: {}", path.display(), e),
    }
}
