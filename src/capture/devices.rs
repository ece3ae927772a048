//! Input device enumeration and selection

use super::traits::{CaptureDevice, DeviceKind, MediaBackend, MediaConstraints};
use crate::utils::error::{CaptureError, CaptureResult};
use std::sync::Arc;

/// Cameras and microphones available to the session
pub struct DeviceCatalog {
    backend: Arc<dyn MediaBackend>,
    devices: Vec<CaptureDevice>,
    selected_video: Option<String>,
    selected_audio: Option<String>,
}

impl DeviceCatalog {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            devices: Vec::new(),
            selected_video: None,
            selected_audio: None,
        }
    }

    /// Re-enumerate devices. Labels are unreliable before a grant, so the
    /// caller must say whether permission has been given.
    pub async fn refresh(&mut self, permission_granted: bool) -> CaptureResult<&[CaptureDevice]> {
        if !permission_granted {
            return Err(CaptureError::PermissionRequired);
        }

        let devices = self.backend.enumerate_devices().await?;
        tracing::info!(
            "Found {} cameras and {} microphones",
            devices.iter().filter(|d| d.kind == DeviceKind::VideoInput).count(),
            devices.iter().filter(|d| d.kind == DeviceKind::AudioInput).count()
        );
        self.devices = devices;
        Ok(&self.devices)
    }

    /// All known devices
    pub fn list(&self) -> &[CaptureDevice] {
        &self.devices
    }

    pub fn videos(&self) -> impl Iterator<Item = &CaptureDevice> {
        self.devices.iter().filter(|d| d.kind == DeviceKind::VideoInput)
    }

    pub fn audios(&self) -> impl Iterator<Item = &CaptureDevice> {
        self.devices.iter().filter(|d| d.kind == DeviceKind::AudioInput)
    }

    pub fn find(&self, id: &str) -> Option<&CaptureDevice> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn selected_video(&self) -> Option<&str> {
        self.selected_video.as_deref()
    }

    pub fn selected_audio(&self) -> Option<&str> {
        self.selected_audio.as_deref()
    }

    /// Remember what the live session actually opened
    pub fn sync_selection(&mut self, video: Option<&str>, audio: Option<&str>) {
        self.selected_video = video.map(str::to_string);
        self.selected_audio = audio.map(str::to_string);
    }

    /// Constraints for the current selection
    pub fn constraints(&self) -> MediaConstraints {
        let mut constraints = MediaConstraints::default();
        if let Some(id) = &self.selected_video {
            constraints = constraints.with_video(id.clone());
        }
        if let Some(id) = &self.selected_audio {
            constraints = constraints.with_audio(id.clone());
        }
        constraints
    }

    /// Constraints that swap in the given camera, keeping the microphone
    pub fn select_video_device(&self, id: &str) -> CaptureResult<MediaConstraints> {
        self.select(id, DeviceKind::VideoInput)
    }

    /// Constraints that swap in the given microphone, keeping the camera
    pub fn select_audio_device(&self, id: &str) -> CaptureResult<MediaConstraints> {
        self.select(id, DeviceKind::AudioInput)
    }

    fn select(&self, id: &str, kind: DeviceKind) -> CaptureResult<MediaConstraints> {
        match self.find(id) {
            Some(device) if device.kind == kind => {}
            _ => return Err(CaptureError::DeviceNotFound(id.to_string())),
        }

        let constraints = self.constraints();
        Ok(match kind {
            DeviceKind::VideoInput => constraints.with_video(id),
            DeviceKind::AudioInput => constraints.with_audio(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::{device, FakeBackend};
    use crate::capture::traits::{DeviceConstraint, MediaAccessError};

    fn two_cameras() -> FakeBackend {
        FakeBackend::new().with_devices(vec![
            device("cam-1", DeviceKind::VideoInput, "Front"),
            device("cam-2", DeviceKind::VideoInput, "USB"),
            device("mic-1", DeviceKind::AudioInput, "Mic"),
        ])
    }

    #[tokio::test]
    async fn test_refresh_requires_permission() {
        let mut catalog = DeviceCatalog::new(Arc::new(two_cameras()));
        assert!(matches!(catalog.refresh(false).await, Err(CaptureError::PermissionRequired)));
        assert!(catalog.list().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_lists_devices() {
        let mut catalog = DeviceCatalog::new(Arc::new(two_cameras()));
        assert_eq!(catalog.refresh(true).await.unwrap().len(), 3);
        assert_eq!(catalog.videos().count(), 2);
        assert_eq!(catalog.audios().count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_propagates_backend_failure() {
        let backend = two_cameras();
        backend.fail_enumeration(MediaAccessError::new("NotSupportedError", "no enumerate"));
        let mut catalog = DeviceCatalog::new(Arc::new(backend));
        assert!(matches!(catalog.refresh(true).await, Err(CaptureError::Backend(_))));
    }

    #[tokio::test]
    async fn test_select_keeps_other_device() {
        let mut catalog = DeviceCatalog::new(Arc::new(two_cameras()));
        catalog.refresh(true).await.unwrap();
        catalog.sync_selection(Some("cam-1"), Some("mic-1"));

        let constraints = catalog.select_video_device("cam-2").unwrap();
        assert_eq!(constraints.video, DeviceConstraint::Exact("cam-2".into()));
        assert_eq!(constraints.audio, DeviceConstraint::Exact("mic-1".into()));
    }

    #[tokio::test]
    async fn test_select_rejects_wrong_kind_or_unknown() {
        let mut catalog = DeviceCatalog::new(Arc::new(two_cameras()));
        catalog.refresh(true).await.unwrap();
        assert!(matches!(catalog.select_video_device("mic-1"), Err(CaptureError::DeviceNotFound(_))));
        assert!(matches!(catalog.select_audio_device("nope"), Err(CaptureError::DeviceNotFound(_))));
    }
}
