//! Download trigger: save a fetched artifact under a chosen file name.
//!
//! Bytes go to a transient file created inside the target directory and are
//! persisted under the final name only once fully written. Dropping the
//! transient file on any error removes it, and directories created for the
//! save are removed again, so a failed save leaves the filesystem unchanged.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::ApiError;

/// Pick the on-disk name for a download.
///
/// Only the last path component of `filename` is honoured. When nothing
/// usable remains, the last segment of `download_url` (query and fragment
/// stripped) is used instead.
pub fn target_file_name(filename: &str, download_url: &str) -> Result<String, ApiError> {
    if let Some(name) = last_component(filename) {
        return Ok(name.to_string());
    }
    let path = download_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = path.split_once("://").map_or(path, |(_, rest)| {
        rest.split_once('/').map_or("", |(_, p)| p)
    });
    last_component(path)
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidFilename(filename.to_string()))
}

fn last_component(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

/// Fill `dir/file_name` through `fill`, replacing any existing file.
///
/// `fill` receives the transient file as its sink; nothing is visible under
/// the final name unless it returns `Ok`.
pub fn save<F>(dir: &Path, file_name: &str, fill: F) -> Result<PathBuf, ApiError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), ApiError>,
{
    let created = missing_dirs(dir);
    fs::create_dir_all(dir)?;
    let result = persist(dir, file_name, fill);
    if result.is_err() {
        // Deepest first; `remove_dir` refuses anything that gained content.
        for created_dir in &created {
            let _ = fs::remove_dir(created_dir);
        }
    }
    result
}

fn persist<F>(dir: &Path, file_name: &str, fill: F) -> Result<PathBuf, ApiError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), ApiError>,
{
    let mut transient = NamedTempFile::new_in(dir)?;
    fill(&mut transient)?;
    transient.flush()?;
    let bytes = transient.as_file().metadata()?.len();

    let target = dir.join(file_name);
    transient
        .persist(&target)
        .map_err(|err| ApiError::Io(err.error))?;
    info!(path = %target.display(), bytes, "download saved");
    Ok(target)
}

/// `dir` and its ancestors that do not exist yet, deepest first.
fn missing_dirs(dir: &Path) -> Vec<PathBuf> {
    dir.ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .map(Path::to_path_buf)
        .collect()
}
