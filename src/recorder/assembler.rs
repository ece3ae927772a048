//! Fragment assembly
//!
//! Collects the encoded fragments of one recording pass, in arrival order,
//! and concatenates them into the artifact once the recorder has stopped.

use super::state::{RecordedArtifact, RecordingSegment};
use crate::utils::error::{CaptureError, CaptureResult};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

struct Batch {
    id: Uuid,
    mime_type: String,
    fragments: Vec<Bytes>,
    size: usize,
    segments: Vec<RecordingSegment>,
}

impl Batch {
    fn open_segment(&mut self) -> Option<&mut RecordingSegment> {
        self.segments.last_mut().filter(|s| s.is_open())
    }
}

#[derive(Default)]
pub struct ChunkAssembler {
    batch: Option<Batch>,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass, dropping anything left from the previous one.
    /// Timing starts now.
    pub fn begin_batch(&mut self, mime_type: &str) -> Uuid {
        if let Some(old) = self.batch.take() {
            tracing::debug!("Dropping unfinished batch {} ({} fragments)", old.id, old.fragments.len());
        }
        let id = Uuid::new_v4();
        self.batch = Some(Batch {
            id,
            mime_type: mime_type.to_string(),
            fragments: Vec::new(),
            size: 0,
            segments: vec![RecordingSegment::begin(0)],
        });
        id
    }

    /// Add the next fragment. Fails with `LateFragment` when no batch is
    /// open; the fragment is dropped.
    pub fn append(&mut self, fragment: Bytes) -> CaptureResult<()> {
        let Some(batch) = self.batch.as_mut() else {
            tracing::warn!("Dropping late fragment ({} bytes)", fragment.len());
            return Err(CaptureError::LateFragment);
        };
        if fragment.is_empty() {
            return Ok(());
        }
        batch.size += fragment.len();
        batch.fragments.push(fragment);
        Ok(())
    }

    /// Close the running timing segment
    pub fn mark_paused(&mut self) {
        if let Some(segment) = self.batch.as_mut().and_then(Batch::open_segment) {
            segment.end();
        }
    }

    /// Open a new timing segment
    pub fn mark_resumed(&mut self) {
        if let Some(batch) = self.batch.as_mut() {
            if batch.open_segment().is_none() {
                let index = batch.segments.len();
                batch.segments.push(RecordingSegment::begin(index));
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.batch.is_some()
    }

    pub fn fragment_count(&self) -> usize {
        self.batch.as_ref().map(|b| b.fragments.len()).unwrap_or(0)
    }

    pub fn size(&self) -> usize {
        self.batch.as_ref().map(|b| b.size).unwrap_or(0)
    }

    /// Recorded time in the open batch, paused stretches excluded
    pub fn elapsed(&self) -> Duration {
        self.batch
            .as_ref()
            .map(|b| b.segments.iter().map(RecordingSegment::elapsed).sum::<Duration>())
            .unwrap_or_default()
    }

    /// Drop the open batch without producing an artifact
    pub fn abandon(&mut self) {
        if let Some(batch) = self.batch.take() {
            tracing::info!("Abandoned batch {} ({} fragments)", batch.id, batch.fragments.len());
        }
    }

    /// Concatenate the batch into an artifact. Returns None if there is no
    /// open batch or the batch holds no data; the batch is closed either way,
    /// so a second call yields None and later appends are late.
    pub fn finalize(&mut self, max: Option<Duration>) -> Option<RecordedArtifact> {
        let mut batch = self.batch.take()?;
        if batch.size == 0 {
            tracing::warn!("Batch {} closed without any data", batch.id);
            return None;
        }
        if let Some(segment) = batch.open_segment() {
            segment.end();
        }

        let mut blob = BytesMut::with_capacity(batch.size);
        for fragment in &batch.fragments {
            blob.extend_from_slice(fragment);
        }

        let recorded: Duration = batch.segments.iter().map(RecordingSegment::elapsed).sum();
        let duration = match max {
            Some(max) => recorded.min(max),
            None => recorded,
        };

        tracing::info!(
            "Finalized batch {}: {} fragments, {} bytes, {:.2}s over {} segments",
            batch.id,
            batch.fragments.len(),
            batch.size,
            duration.as_secs_f64(),
            batch.segments.len()
        );

        Some(RecordedArtifact {
            id: batch.id,
            blob: blob.freeze(),
            mime_type: batch.mime_type,
            duration_seconds: duration.as_secs_f64(),
            segments: batch.segments,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_in_arrival_order() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm");
        assembler.append(Bytes::from_static(b"b1-")).unwrap();
        assembler.append(Bytes::from_static(b"b2-")).unwrap();
        assembler.append(Bytes::from_static(b"b3")).unwrap();
        assert_eq!(assembler.fragment_count(), 3);

        let artifact = assembler.finalize(None).unwrap();
        assert_eq!(&artifact.blob[..], b"b1-b2-b3");
        assert_eq!(artifact.mime_type, "video/webm");
        assert_eq!(artifact.size(), 8);
    }

    #[test]
    fn test_append_after_finalize_is_late() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm");
        assembler.append(Bytes::from_static(b"a")).unwrap();
        assembler.finalize(None).unwrap();

        assert!(matches!(
            assembler.append(Bytes::from_static(b"late")),
            Err(CaptureError::LateFragment)
        ));
        assert!(assembler.finalize(None).is_none());
    }

    #[test]
    fn test_begin_batch_clears_previous() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm");
        assembler.append(Bytes::from_static(b"old")).unwrap();
        assembler.begin_batch("video/webm");
        assert_eq!(assembler.fragment_count(), 0);
        assert_eq!(assembler.size(), 0);
    }

    #[test]
    fn test_empty_fragments_are_skipped() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm");
        assembler.append(Bytes::new()).unwrap();
        assert_eq!(assembler.fragment_count(), 0);
    }

    #[test]
    fn test_batch_without_data_yields_nothing() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm");
        assembler.append(Bytes::new()).unwrap();

        assert!(assembler.finalize(None).is_none());
        assert!(!assembler.is_open());
        assert!(matches!(
            assembler.append(Bytes::from_static(b"late")),
            Err(CaptureError::LateFragment)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_excludes_pauses_and_is_clamped() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm");
        assembler.append(Bytes::from_static(b"a")).unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assembler.mark_paused();
        tokio::time::advance(Duration::from_secs(10)).await;
        assembler.mark_resumed();
        tokio::time::advance(Duration::from_secs(2)).await;

        let artifact = assembler.finalize(Some(Duration::from_secs(3))).unwrap();
        assert_eq!(artifact.segments.len(), 2);
        assert!((artifact.duration_seconds - 3.0).abs() < 1e-9);

        assembler.begin_batch("video/webm");
        assembler.append(Bytes::from_static(b"b")).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        let artifact = assembler.finalize(None).unwrap();
        assert!((artifact.duration_seconds - 1.0).abs() < 1e-9);
    }
}
