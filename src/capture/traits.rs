//! Capture trait definitions
//!
//! Platform-agnostic traits for the media capability provider. A backend
//! grants access to camera and microphone, enumerates input devices, and
//! creates recorders that push encoded fragments back over a channel.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Kind of an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
}

impl DeviceKind {
    pub fn track_kind(&self) -> TrackKind {
        match self {
            DeviceKind::VideoInput => TrackKind::Video,
            DeviceKind::AudioInput => TrackKind::Audio,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::VideoInput => write!(f, "video-input"),
            DeviceKind::AudioInput => write!(f, "audio-input"),
        }
    }
}

/// Information about a camera or microphone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDevice {
    /// Unique device ID
    pub id: String,

    /// Device kind
    pub kind: DeviceKind,

    /// Human readable label (empty until permission is granted)
    pub label: String,

    /// Physical device grouping, when the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Kind of a media track inside a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// Which device a track request is bound to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "deviceId")]
pub enum DeviceConstraint {
    /// Let the platform pick
    #[default]
    Any,
    /// Only this exact device
    Exact(String),
}

impl DeviceConstraint {
    pub fn device_id(&self) -> Option<&str> {
        match self {
            DeviceConstraint::Any => None,
            DeviceConstraint::Exact(id) => Some(id),
        }
    }
}

/// Combined video + audio request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConstraints {
    pub video: DeviceConstraint,
    pub audio: DeviceConstraint,
}

impl MediaConstraints {
    pub fn with_video(mut self, id: impl Into<String>) -> Self {
        self.video = DeviceConstraint::Exact(id.into());
        self
    }

    pub fn with_audio(mut self, id: impl Into<String>) -> Self {
        self.audio = DeviceConstraint::Exact(id.into());
        self
    }
}

/// Failure reported by the media backend.
///
/// `name` carries the platform's error signal (for browsers the
/// `DOMException` name, e.g. `NotAllowedError`), which permission
/// classification keys on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct MediaAccessError {
    pub name: String,
    pub message: String,
}

impl MediaAccessError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Options a recorder is created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Negotiated container/codec string
    pub mime_type: String,

    /// Interval at which the recorder delivers fragments
    pub timeslice: Duration,
}

/// Messages pushed by a running recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// One encoded chunk, in delivery order
    Fragment(Bytes),
    /// The encoder failed; the current recording cannot be completed
    Error(String),
    /// The recorder acknowledged stop; no fragment follows
    Stopped,
}

pub type RecorderEvents = mpsc::UnboundedReceiver<RecorderEvent>;

/// A live camera + microphone stream shared by preview and recorder
pub trait MediaStream: Send + Sync {
    /// Stream identifier
    fn id(&self) -> &str;

    /// Device currently feeding tracks of this kind
    fn device_id(&self, kind: TrackKind) -> Option<String>;

    /// Whether the stream has at least one track of this kind
    fn has_track(&self, kind: TrackKind) -> bool;

    /// Enabled flag of the tracks of this kind
    fn is_enabled(&self, kind: TrackKind) -> bool;

    /// Flip the enabled flag of every track of this kind in place.
    /// Returns the number of tracks touched.
    fn set_enabled(&self, kind: TrackKind, enabled: bool) -> usize;

    /// Stop every track and release the devices
    fn stop(&self);

    /// Whether any track is still live
    fn is_live(&self) -> bool;
}

/// Streaming recorder bound to one stream
pub trait MediaRecorder: Send {
    /// Mime type the recorder is producing
    fn mime_type(&self) -> &str;

    /// Begin recording; fragments and the stop acknowledgement arrive on
    /// the returned channel.
    fn start(&mut self) -> Result<RecorderEvents, MediaAccessError>;

    fn pause(&mut self) -> Result<(), MediaAccessError>;

    fn resume(&mut self) -> Result<(), MediaAccessError>;

    /// Request stop. The final fragment (if any) and `RecorderEvent::Stopped`
    /// are delivered asynchronously on the event channel.
    fn stop(&mut self) -> Result<(), MediaAccessError>;
}

/// Media capability provider, selected once when the controller is built
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Prompt for camera + microphone access
    async fn request_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, MediaAccessError>;

    /// List input devices. Labels are only reliable after a grant.
    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, MediaAccessError>;

    /// Whether the recorder can produce this mime type
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Create a recorder over the given stream
    fn create_recorder(
        &self,
        stream: &dyn MediaStream,
        options: &RecorderOptions,
    ) -> Result<Box<dyn MediaRecorder>, MediaAccessError>;
}
