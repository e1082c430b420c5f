//! Filesystem helpers for files that get renamed into place.
//!
//! Published files (audio, sidecars, the feed) are served by whatever web
//! server points at the store, so they must not keep tempfile's owner-only
//! mode once renamed over their destination.

use std::fs::Permissions;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Mode for served files: owner read/write, everyone else read.
#[cfg(unix)]
pub const SHARED_MODE: u32 = 0o644;

/// Permissions for a newly published file, or `None` where the platform has
/// no mode bits to set.
pub fn shared_permissions() -> Option<Permissions> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(Permissions::from_mode(SHARED_MODE))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Create a hidden temporary file in `dir` that will later be persisted over
/// a destination in the same directory.
///
/// `suffix` keeps the staging name from matching the store's episode filter.
/// When `permissions` is given it is applied to the file itself, so the
/// result does not depend on the process umask.
pub fn staging_file(
    dir: &Path,
    suffix: &str,
    permissions: Option<&Permissions>,
) -> io::Result<NamedTempFile> {
    let temp = tempfile::Builder::new()
        .prefix(".briefcast-")
        .suffix(suffix)
        .tempfile_in(dir)?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions.clone())?;
    }
    Ok(temp)
}
