//! Events emitted during recording

use super::state::{SessionState, StopReason};
use crate::upload::UploadStatus;
use uuid::Uuid;

/// Notifications broadcast by the recording controller
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// Session state changed
    StateChanged(SessionState),
    /// Recording started
    Started { recording_id: Uuid },
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// Recording finalized
    Stopped {
        duration_seconds: f64,
        size: usize,
        reason: StopReason,
    },
    /// A fragment arrived with no recording to receive it
    FragmentDropped { size: usize },
    /// Capture devices were re-acquired
    DevicesChanged {
        video: Option<String>,
        audio: Option<String>,
    },
    /// Upload progress
    Upload(UploadStatus),
    /// User-visible failure
    Error(String),
}

/// Signals the controller sends itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// The duration guard of this recording expired
    DurationExpired { recording_id: Uuid },
}
