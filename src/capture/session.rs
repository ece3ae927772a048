//! Live capture session
//!
//! Owns the media stream shared by preview and recorder, plus the recorder
//! of the current recording pass. Dropping a session releases its devices.

use super::traits::{MediaRecorder, MediaStream, RecorderEvents, TrackKind};
use uuid::Uuid;

pub struct CaptureSession {
    /// Session identifier, for logs
    id: Uuid,

    /// Camera + microphone stream
    stream: Box<dyn MediaStream>,

    /// Device feeding the video track
    video_device_id: Option<String>,

    /// Device feeding the audio track
    audio_device_id: Option<String>,

    /// Recorder of the current pass, scoped to this session
    recorder: Option<Box<dyn MediaRecorder>>,

    /// Fragment and stop notifications from the recorder
    events: Option<RecorderEvents>,

    released: bool,
}

impl CaptureSession {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        let video_device_id = stream.device_id(TrackKind::Video);
        let audio_device_id = stream.device_id(TrackKind::Audio);
        let session = Self {
            id: Uuid::new_v4(),
            stream,
            video_device_id,
            audio_device_id,
            recorder: None,
            events: None,
            released: false,
        };
        tracing::info!(
            "Capture session {} opened (stream {}, video={:?}, audio={:?})",
            session.id,
            session.stream.id(),
            session.video_device_id,
            session.audio_device_id
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stream(&self) -> &dyn MediaStream {
        self.stream.as_ref()
    }

    pub fn video_device_id(&self) -> Option<&str> {
        self.video_device_id.as_deref()
    }

    pub fn audio_device_id(&self) -> Option<&str> {
        self.audio_device_id.as_deref()
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.stream.is_enabled(kind)
    }

    pub fn is_live(&self) -> bool {
        !self.released && self.stream.is_live()
    }

    /// Install the recorder for a new pass, replacing any previous one
    pub(crate) fn attach_recorder(&mut self, recorder: Box<dyn MediaRecorder>, events: RecorderEvents) {
        self.recorder = Some(recorder);
        self.events = Some(events);
    }

    pub(crate) fn recorder_mut(&mut self) -> Option<&mut (dyn MediaRecorder + 'static)> {
        self.recorder.as_deref_mut()
    }

    pub(crate) fn events_mut(&mut self) -> Option<&mut RecorderEvents> {
        self.events.as_mut()
    }

    /// Drop the recorder and close its event channel. Anything the recorder
    /// sends afterwards is discarded by the channel.
    pub(crate) fn detach_recorder(&mut self) {
        if let Some(mut events) = self.events.take() {
            events.close();
        }
        self.recorder = None;
    }

    /// Stop every track. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.detach_recorder();
        self.stream.stop();
        self.released = true;
        tracing::info!("Capture session {} released", self.id);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("stream", &self.stream.id())
            .field("video_device_id", &self.video_device_id)
            .field("audio_device_id", &self.audio_device_id)
            .field("recording", &self.recorder.is_some())
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::FakeBackend;
    use crate::capture::traits::{MediaBackend, MediaConstraints};

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let backend = FakeBackend::new();
        let stream = backend.request_media(&MediaConstraints::default()).await.unwrap();
        let mut session = CaptureSession::new(stream);
        assert_eq!(session.video_device_id(), Some("cam-1"));

        session.release();
        session.release();
        drop(session);

        let probe = backend.last_stream().unwrap();
        assert_eq!(probe.stop_calls(), 1);
        assert!(!probe.is_live());
    }

    #[tokio::test]
    async fn test_drop_stops_tracks() {
        let backend = FakeBackend::new();
        let stream = backend.request_media(&MediaConstraints::default()).await.unwrap();
        drop(CaptureSession::new(stream));
        assert!(!backend.last_stream().unwrap().is_live());
    }
}
