//! Queue processor: pulls submitted jobs and runs each on a worker slot.

use super::PlaylistDownloader;
use super::lifecycle::SHUTDOWN_REASON;
use crate::types::JobId;
use tokio::sync::mpsc;

impl PlaylistDownloader {
    /// Start the queue processor task
    ///
    /// This method spawns a background task that continuously:
    /// 1. Waits for the next submitted job ID
    /// 2. Acquires a permit from the concurrency limiter (respects max_concurrent_jobs)
    /// 3. Spawns the job task, which holds the permit until the job is terminal
    /// 4. Repeats until shutdown
    ///
    /// Jobs are started in submission order. On shutdown the queue is closed
    /// and anything still in it is failed, so a submission racing the
    /// shutdown either gets rejected or ends `failed`.
    pub(crate) fn start_queue_processor(
        &self,
        mut queue_rx: mpsc::UnboundedReceiver<JobId>,
    ) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();
        let shutdown = self.queue_state.shutdown_token.clone();
        let concurrent_limit = self.queue_state.concurrent_limit.clone();

        tokio::spawn(async move {
            loop {
                let id = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    next = queue_rx.recv() => match next {
                        Some(id) => id,
                        None => break,
                    },
                };

                // Blocks while every worker slot is busy
                let permit = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        downloader.abandon_queued(id, SHUTDOWN_REASON).await;
                        break;
                    }
                    permit = concurrent_limit.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                downloader.queue_state.active_jobs.lock().await.insert(id);

                let worker = downloader.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    worker.run_job_task(id).await;
                    worker.queue_state.active_jobs.lock().await.remove(&id);
                });
            }

            queue_rx.close();
            while let Ok(id) = queue_rx.try_recv() {
                downloader.abandon_queued(id, SHUTDOWN_REASON).await;
            }
            tracing::debug!("queue processor stopped");
        })
    }
}
