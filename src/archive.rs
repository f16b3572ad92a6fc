//! Archive assembly for finished downloads
//!
//! Everything under a job's working directory is packed into one deflated
//! ZIP. The archive is written under a temporary name, synced and renamed
//! into place; only then is the working directory removed.

use crate::error::{ArchiveError, Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File extensions counted as downloaded tracks (compared case-insensitively)
pub const MEDIA_EXTENSIONS: [&str; 5] = ["mp3", "wav", "flac", "m4a", "ogg"];

/// Deflate level used for every entry
const COMPRESSION_LEVEL: i32 = 6;

/// Count media files anywhere below `dir`
///
/// A missing directory counts as zero.
pub fn count_media_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_media_file(entry.path()))
        .count()
}

/// [`count_media_files`] on the blocking thread pool
pub async fn count_media_files_blocking(dir: PathBuf) -> Result<usize> {
    tokio::task::spawn_blocking(move || count_media_files(&dir))
        .await
        .map_err(|e| Error::Other(format!("media scan task failed: {}", e)))
}

fn is_media_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}

/// Pack `source_dir` into the ZIP at `dest` and remove `source_dir`
///
/// Runs the blocking work on the blocking thread pool. Returns the number of
/// files written.
///
/// # Errors
///
/// [`ArchiveError::NoFiles`] if the directory holds no files (no archive is
/// created), [`ArchiveError::Write`] if writing fails (any partial output is
/// removed).
pub async fn archive_directory(source_dir: PathBuf, dest: PathBuf) -> Result<usize> {
    tokio::task::spawn_blocking(move || create_archive(&source_dir, &dest))
        .await
        .map_err(|e| Error::Other(format!("archive task failed: {}", e)))?
}

/// Blocking version of [`archive_directory`]
pub fn create_archive(source_dir: &Path, dest: &Path) -> Result<usize> {
    let files = collect_files(source_dir);
    if files.is_empty() {
        return Err(ArchiveError::NoFiles(source_dir.to_path_buf()).into());
    }

    let partial = partial_path(dest);
    if let Err(reason) = write_zip(source_dir, &files, &partial) {
        if let Err(e) = std::fs::remove_file(&partial) {
            debug!(path = %partial.display(), error = %e, "no partial archive to remove");
        }
        return Err(ArchiveError::Write {
            path: dest.to_path_buf(),
            reason,
        }
        .into());
    }

    std::fs::rename(&partial, dest).map_err(|e| ArchiveError::Write {
        path: dest.to_path_buf(),
        reason: format!("failed to move archive into place: {}", e),
    })?;

    info!(
        archive = %dest.display(),
        files = files.len(),
        "archive created"
    );

    if let Err(e) = std::fs::remove_dir_all(source_dir) {
        warn!(
            dir = %source_dir.display(),
            error = %e,
            "failed to remove working directory after archiving"
        );
    }

    Ok(files.len())
}

fn collect_files(source_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(source_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

// ZIP entry names always use forward slashes
fn entry_name(source_dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(source_dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn write_zip(source_dir: &Path, files: &[PathBuf], partial: &Path) -> std::result::Result<(), String> {
    if let Some(parent) = partial.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create output directory: {}", e))?;
    }
    let file = File::create(partial).map_err(|e| format!("failed to create archive: {}", e))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for path in files {
        let Some(name) = entry_name(source_dir, path) else {
            continue;
        };
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| format!("failed to add {}: {}", name, e))?;
        let mut input =
            File::open(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        std::io::copy(&mut input, &mut writer)
            .map_err(|e| format!("failed to compress {}: {}", name, e))?;
    }

    let mut file = writer
        .finish()
        .map_err(|e| format!("failed to finish archive: {}", e))?;
    file.flush()
        .and_then(|()| file.sync_all())
        .map_err(|e| format!("failed to sync archive: {}", e))
}
