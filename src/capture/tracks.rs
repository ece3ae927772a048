//! Track enable/disable without touching the stream
//!
//! A disabled video track records as black frames and a disabled audio
//! track as silence; the recorder keeps running either way.

use super::session::CaptureSession;
use super::traits::TrackKind;

pub struct TrackToggler;

impl TrackToggler {
    /// Flip the camera. Returns the new enabled flag, or None if the
    /// session has no video track.
    pub fn toggle_video(session: &CaptureSession) -> Option<bool> {
        Self::toggle(session, TrackKind::Video)
    }

    /// Flip the microphone. Returns the new enabled flag, or None if the
    /// session has no audio track.
    pub fn toggle_audio(session: &CaptureSession) -> Option<bool> {
        Self::toggle(session, TrackKind::Audio)
    }

    pub fn toggle(session: &CaptureSession, kind: TrackKind) -> Option<bool> {
        let stream = session.stream();
        let enabled = !stream.is_enabled(kind);
        if stream.set_enabled(kind, enabled) == 0 {
            tracing::debug!("No {} track to toggle", kind);
            return None;
        }
        tracing::info!("{} track {}", kind, if enabled { "enabled" } else { "disabled" });
        Some(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::{device, FakeBackend};
    use crate::capture::traits::{DeviceKind, MediaBackend, MediaConstraints};

    #[tokio::test]
    async fn test_toggle_twice_restores() {
        let backend = FakeBackend::new();
        let session = CaptureSession::new(backend.request_media(&MediaConstraints::default()).await.unwrap());
        let probe = backend.last_stream().unwrap();
        let queries = probe.track_queries();

        assert_eq!(TrackToggler::toggle_video(&session), Some(false));
        assert!(!probe.is_enabled(TrackKind::Video));
        assert_eq!(TrackToggler::toggle_video(&session), Some(true));
        assert!(probe.is_enabled(TrackKind::Video));
        assert!(probe.is_enabled(TrackKind::Audio));

        assert_eq!(probe.stop_calls(), 0);
        assert_eq!(probe.track_queries(), queries);
    }

    #[tokio::test]
    async fn test_toggle_missing_track() {
        let backend = FakeBackend::new().with_devices(vec![device("cam-1", DeviceKind::VideoInput, "Cam")]);
        let session = CaptureSession::new(backend.request_media(&MediaConstraints::default()).await.unwrap());
        assert_eq!(TrackToggler::toggle_audio(&session), None);
    }
}
