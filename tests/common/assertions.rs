//! Custom test assertions for integration tests

use playlist_dl::{JobId, JobSnapshot, PlaylistDownloader};
use std::path::Path;
use std::time::Duration;

/// Poll until the job is terminal and return its final snapshot
///
/// Panics if the job is still active after `timeout`.
pub async fn wait_for_terminal(
    downloader: &PlaylistDownloader,
    id: JobId,
    timeout: Duration,
) -> JobSnapshot {
    let result = tokio::time::timeout(timeout, async {
        loop {
            let snapshot = downloader.get_status(id).await.unwrap();
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    match result {
        Ok(snapshot) => snapshot,
        Err(_) => panic!("job {id} did not reach a terminal state within {timeout:?}"),
    }
}

/// Number of entries in a ZIP archive
pub fn zip_entry_count(path: &Path) -> usize {
    let file = std::fs::File::open(path).unwrap();
    zip::ZipArchive::new(file).unwrap().len()
}

/// Number of entries directly inside a directory
pub fn dir_entry_count(path: &Path) -> usize {
    std::fs::read_dir(path)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
