//! Recording state management
//!
//! Defines the session state machine, timing segments, configuration and
//! the finished artifact.

use crate::capture::permissions::DenialReason;
use crate::utils::error::{CaptureError, CaptureResult};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Current state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "reason")]
pub enum SessionState {
    /// Nothing acquired yet
    Idle,
    /// Waiting on the permission prompt
    AcquiringPermission,
    /// Access refused; retry with a new permission request
    PermissionDenied(DenialReason),
    /// Devices live, preview running, not recording
    Ready,
    /// Recorder running
    Recording,
    /// Recorder paused
    Paused,
    /// Artifact finalized, devices still live
    Stopped,
    /// Artifact handed to the upload sink
    Uploading,
    /// Upload sink accepted the artifact
    Uploaded,
    /// Upload sink rejected the artifact; retry available
    UploadFailed,
}

impl SessionState {
    /// Whether a recorder pass is in flight
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Paused)
    }

    /// Whether a finalized artifact is held
    pub fn has_artifact(&self) -> bool {
        matches!(
            self,
            SessionState::Stopped | SessionState::Uploading | SessionState::Uploaded | SessionState::UploadFailed
        )
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::AcquiringPermission => write!(f, "acquiring permission"),
            SessionState::PermissionDenied(reason) => write!(f, "permission denied ({reason})"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Recording => write!(f, "recording"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Uploading => write!(f, "uploading"),
            SessionState::Uploaded => write!(f, "uploaded"),
            SessionState::UploadFailed => write!(f, "upload failed"),
        }
    }
}

/// One uninterrupted stretch of recording
///
/// A new segment is opened on start and on every resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSegment {
    /// Segment index (0, 1, 2, ...)
    pub index: usize,

    /// Duration of this segment in milliseconds
    pub duration_ms: f64,

    /// Unix timestamp when the segment started
    pub unix_start_ms: i64,

    /// Unix timestamp when the segment ended
    pub unix_end_ms: i64,

    #[serde(skip)]
    started_at: Option<Instant>,
}

impl RecordingSegment {
    /// Open a segment starting now
    pub fn begin(index: usize) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            index,
            duration_ms: 0.0,
            unix_start_ms: now,
            unix_end_ms: now,
            started_at: Some(Instant::now()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.started_at.is_some()
    }

    /// Elapsed time, counting up to now while open
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(start) => start.elapsed(),
            None => Duration::from_secs_f64(self.duration_ms / 1000.0),
        }
    }

    /// Close the segment. No-op if already closed.
    pub fn end(&mut self) {
        if let Some(start) = self.started_at.take() {
            self.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            self.unix_end_ms = Utc::now().timestamp_millis();
        }
    }
}

/// Why a recording pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// Explicit stop
    User,
    /// Maximum duration reached
    MaxDuration,
    /// The recorder stopped on its own (device lost, track ended)
    RecorderEnded,
}

/// Finished recording
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedArtifact {
    pub id: Uuid,

    /// Concatenated fragments, in arrival order
    #[serde(skip)]
    pub blob: Bytes,

    pub mime_type: String,

    /// Recorded time, paused intervals excluded
    pub duration_seconds: f64,

    pub segments: Vec<RecordingSegment>,

    pub created_at: DateTime<Utc>,
}

impl RecordedArtifact {
    pub fn size(&self) -> usize {
        self.blob.len()
    }
}

/// Configuration for the recording controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Recording is stopped once this much time has been recorded.
    /// None disables the limit.
    pub max_duration_seconds: Option<f64>,

    /// Interval at which the recorder delivers fragments
    pub timeslice_ms: u64,

    /// Mime types to try, in order of preference
    pub preferred_mime_types: Vec<String>,

    /// How long stop waits for the recorder to flush
    pub stop_ack_timeout_ms: u64,

    /// Per-attempt upload timeout
    pub upload_timeout_secs: Option<u64>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration_seconds: Some(60.0),
            timeslice_ms: 1000,
            preferred_mime_types: vec![
                "video/webm;codecs=vp9,opus".to_string(),
                "video/webm;codecs=vp8,opus".to_string(),
                "video/webm".to_string(),
                "video/mp4".to_string(),
            ],
            stop_ack_timeout_ms: 2000,
            upload_timeout_secs: None,
        }
    }
}

impl RecorderConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> CaptureResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CaptureResult<()> {
        if let Some(max) = self.max_duration_seconds {
            if !max.is_finite() || max <= 0.0 {
                return Err(CaptureError::Config(format!(
                    "maxDurationSeconds must be a positive number, got {max}"
                )));
            }
        }
        if self.timeslice_ms == 0 {
            return Err(CaptureError::Config("timesliceMs must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_seconds.map(Duration::from_secs_f64)
    }

    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }

    pub fn stop_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_ack_timeout_ms)
    }

    pub fn upload_timeout(&self) -> Option<Duration> {
        self.upload_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config = RecorderConfig::from_json_str(r#"{ "maxDurationSeconds": 3 }"#).unwrap();
        assert_eq!(config.max_duration(), Some(Duration::from_secs(3)));
        assert_eq!(config.timeslice_ms, 1000);
        assert_eq!(config.preferred_mime_types.len(), 4);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            RecorderConfig::from_json_str(r#"{ "maxDurationSeconds": 0 }"#),
            Err(CaptureError::Config(_))
        ));
        assert!(matches!(
            RecorderConfig::from_json_str(r#"{ "timesliceMs": 0 }"#),
            Err(CaptureError::Config(_))
        ));
        assert!(matches!(
            RecorderConfig::from_json_str("not json"),
            Err(CaptureError::Serialization(_))
        ));
    }

    #[test]
    fn test_state_serializes_with_reason() {
        let json = serde_json::to_string(&SessionState::PermissionDenied(DenialReason::NoDevice)).unwrap();
        assert_eq!(json, r#"{"state":"permission-denied","reason":"no-device"}"#);
        let json = serde_json::to_string(&SessionState::Ready).unwrap();
        assert_eq!(json, r#"{"state":"ready"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_segment_measures_elapsed() {
        let mut segment = RecordingSegment::begin(0);
        tokio::time::advance(Duration::from_millis(1500)).await;
        segment.end();
        assert!(!segment.is_open());
        assert!((segment.duration_ms - 1500.0).abs() < 1.0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(segment.elapsed(), Duration::from_millis(1500));
    }
}
