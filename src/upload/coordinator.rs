//! Upload coordinator
//!
//! Hands a finished artifact to the upload sink, publishes progress and
//! keeps the artifact around after a failure so it can be retried without
//! re-recording.

use super::sink::UploadSink;
use crate::recorder::state::RecordedArtifact;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Upload progress as seen by observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum UploadStatus {
    Idle,
    Uploading { attempt: u32 },
    Uploaded,
    Failed { error: String },
}

/// Result of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn success() -> Self {
        Self { ok: true, error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

pub struct UploadCoordinator {
    artifact: Option<RecordedArtifact>,
    sink: Option<Arc<dyn UploadSink>>,
    timeout: Option<Duration>,
    attempts: u32,
    status: watch::Sender<UploadStatus>,
}

impl UploadCoordinator {
    pub fn new(timeout: Option<Duration>) -> Self {
        let (status, _) = watch::channel(UploadStatus::Idle);
        Self {
            artifact: None,
            sink: None,
            timeout,
            attempts: 0,
            status,
        }
    }

    /// Observe upload progress
    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> UploadStatus {
        self.status.borrow().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Artifact retained for retry
    pub fn artifact(&self) -> Option<&RecordedArtifact> {
        self.artifact.as_ref()
    }

    /// Upload an artifact. A new artifact resets the attempt count; the
    /// artifact that was already uploaded is not sent again.
    pub async fn upload(&mut self, artifact: RecordedArtifact, sink: Arc<dyn UploadSink>) -> UploadOutcome {
        let same = self.artifact.as_ref().map(|a| a.id) == Some(artifact.id);
        if same && self.status() == UploadStatus::Uploaded {
            tracing::debug!("Artifact {} already uploaded", artifact.id);
            return UploadOutcome::success();
        }
        if !same {
            self.attempts = 0;
        }

        self.artifact = Some(artifact);
        self.sink = Some(sink);
        self.attempt().await
    }

    /// Re-send the retained artifact after a failure. None when there is
    /// nothing to retry.
    pub async fn retry(&mut self) -> Option<UploadOutcome> {
        if !matches!(self.status(), UploadStatus::Failed { .. }) {
            tracing::debug!("Retry ignored, upload is {:?}", self.status());
            return None;
        }
        if self.artifact.is_none() || self.sink.is_none() {
            return None;
        }
        Some(self.attempt().await)
    }

    /// Mark an attempt whose future was dropped before it finished as
    /// failed, keeping the artifact for retry. Returns whether one was
    /// in flight.
    pub fn interrupt(&mut self, error: &str) -> bool {
        if !matches!(self.status(), UploadStatus::Uploading { .. }) {
            return false;
        }
        tracing::warn!("Upload attempt {} interrupted", self.attempts);
        self.status.send_replace(UploadStatus::Failed {
            error: error.to_string(),
        });
        true
    }

    /// Forget the artifact, e.g. when the recording is discarded
    pub fn reset(&mut self) {
        self.artifact = None;
        self.sink = None;
        self.attempts = 0;
        self.status.send_replace(UploadStatus::Idle);
    }

    pub fn uploaded_artifact_id(&self) -> Option<Uuid> {
        match self.status() {
            UploadStatus::Uploaded => self.artifact.as_ref().map(|a| a.id),
            _ => None,
        }
    }

    async fn attempt(&mut self) -> UploadOutcome {
        let (Some(artifact), Some(sink)) = (self.artifact.as_ref(), self.sink.clone()) else {
            return UploadOutcome::failure("Nothing to upload");
        };

        self.attempts += 1;
        let attempt = self.attempts;
        self.status.send_replace(UploadStatus::Uploading { attempt });
        tracing::info!(
            "Uploading artifact {} ({} bytes, attempt {})",
            artifact.id,
            artifact.size(),
            attempt
        );

        let send = sink.upload(artifact.blob.clone(), &artifact.mime_type);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, send).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("Upload timed out after {}s", limit.as_secs())),
            },
            None => send.await,
        };

        match result {
            Ok(()) => {
                tracing::info!("Artifact {} uploaded", artifact.id);
                self.status.send_replace(UploadStatus::Uploaded);
                UploadOutcome::success()
            }
            Err(e) => {
                let mut error = format!("{e:#}");
                if error.trim().is_empty() {
                    error = "The upload could not be completed. Check your connection and retry.".to_string();
                }
                tracing::warn!("Upload of artifact {} failed: {}", artifact.id, error);
                self.status.send_replace(UploadStatus::Failed { error: error.clone() });
                UploadOutcome::failure(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::assembler::ChunkAssembler;
    use crate::upload::sink::FnUploadSink;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn artifact(data: &'static [u8]) -> RecordedArtifact {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm");
        assembler.append(Bytes::from_static(data)).unwrap();
        assembler.finalize(None).unwrap()
    }

    /// Fails the first `failures` calls, records every blob it sees
    struct FlakySink {
        failures: usize,
        calls: AtomicUsize,
        seen: Mutex<Vec<Bytes>>,
    }

    #[async_trait::async_trait]
    impl UploadSink for FlakySink {
        async fn upload(&self, blob: Bytes, _mime_type: &str) -> anyhow::Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(blob);
            if n < self.failures {
                anyhow::bail!("503 Service Unavailable");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failure_preserves_artifact_for_retry() {
        let sink = Arc::new(FlakySink {
            failures: 1,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        });
        let mut uploads = UploadCoordinator::new(None);

        let outcome = uploads.upload(artifact(b"clip"), sink.clone()).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error.as_deref(), Some("503 Service Unavailable"));
        assert!(matches!(uploads.status(), UploadStatus::Failed { .. }));
        assert!(uploads.artifact().is_some());

        let outcome = uploads.retry().await.unwrap();
        assert!(outcome.ok);
        assert_eq!(uploads.status(), UploadStatus::Uploaded);
        assert_eq!(uploads.attempts(), 2);

        let seen = sink.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[0].as_ptr(), seen[1].as_ptr());
    }

    #[tokio::test]
    async fn test_uploaded_is_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let sink: Arc<dyn UploadSink> = Arc::new(FnUploadSink::new(move |_blob: Bytes| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
        }));
        let mut uploads = UploadCoordinator::new(None);
        let clip = artifact(b"clip");

        assert!(uploads.upload(clip.clone(), sink.clone()).await.ok);
        assert!(uploads.upload(clip, sink.clone()).await.ok);
        assert!(uploads.retry().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(uploads.uploaded_artifact_id().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_attempt_can_be_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let sink: Arc<dyn UploadSink> = Arc::new(FnUploadSink::new(move |_blob: Bytes| {
            let first = c.fetch_add(1, Ordering::SeqCst) == 0;
            async move {
                if first {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Ok::<(), anyhow::Error>(())
            }
        }));
        let mut uploads = UploadCoordinator::new(None);

        let cancelled = tokio::time::timeout(Duration::from_secs(5), uploads.upload(artifact(b"clip"), sink)).await;
        assert!(cancelled.is_err());
        assert_eq!(uploads.status(), UploadStatus::Uploading { attempt: 1 });

        assert!(uploads.interrupt("interrupted"));
        assert!(!uploads.interrupt("interrupted"));
        assert!(uploads.retry().await.unwrap().ok);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failure() {
        let sink: Arc<dyn UploadSink> = Arc::new(FnUploadSink::new(|_blob: Bytes| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), anyhow::Error>(())
        }));
        let mut uploads = UploadCoordinator::new(Some(Duration::from_secs(5)));
        let mut status = uploads.subscribe();

        let outcome = uploads.upload(artifact(b"clip"), sink).await;
        assert_eq!(outcome.error.as_deref(), Some("Upload timed out after 5s"));
        assert!(status.has_changed().unwrap());
        assert!(matches!(&*status.borrow_and_update(), UploadStatus::Failed { .. }));
    }
}
