//! Camera and microphone permission handling
//!
//! Requests combined access from the media backend and classifies refusals
//! into reasons the UI can act on.

use super::session::CaptureSession;
use super::traits::{MediaAccessError, MediaBackend, MediaConstraints};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Why access to the camera or microphone was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
    /// The user (or a policy) declined the prompt
    DeniedByUser,
    /// No matching camera or microphone exists
    NoDevice,
    /// The hardware is busy or could not be started
    DeviceInUse,
    /// Anything the platform did not explain
    Unknown,
}

impl DenialReason {
    /// Map a backend error signal to a reason
    pub fn classify(error: &MediaAccessError) -> Self {
        match error.name.as_str() {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => Self::DeniedByUser,
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => Self::NoDevice,
            "NotReadableError" | "TrackStartError" | "AbortError" => Self::DeviceInUse,
            _ => Self::Unknown,
        }
    }

    /// User-facing message
    pub fn message(&self) -> &'static str {
        match self {
            Self::DeniedByUser => {
                "Camera and microphone access denied. Allow access in your browser settings and try again."
            }
            Self::NoDevice => "No camera or microphone found. Connect a device and try again.",
            Self::DeviceInUse => {
                "Your camera or microphone is in use by another application. Close it and try again."
            }
            Self::Unknown => "Could not access your camera and microphone. Please try again.",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeniedByUser => write!(f, "denied-by-user"),
            Self::NoDevice => write!(f, "no-device"),
            Self::DeviceInUse => write!(f, "device-in-use"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A classified refusal with the backend detail kept for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenial {
    pub reason: DenialReason,
    pub detail: MediaAccessError,
}

impl PermissionDenial {
    pub fn message(&self) -> &'static str {
        self.reason.message()
    }
}

/// Acquires camera + microphone streams from the backend
pub struct PermissionController {
    backend: Arc<dyn MediaBackend>,
}

impl PermissionController {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self { backend }
    }

    /// Request combined video + audio access.
    ///
    /// Every failure is classified; nothing escapes as a raw backend error.
    pub async fn request(&self, constraints: &MediaConstraints) -> Result<CaptureSession, PermissionDenial> {
        tracing::info!("Requesting camera and microphone access via {}", self.backend.name());

        match self.backend.request_media(constraints).await {
            Ok(stream) => Ok(CaptureSession::new(stream)),
            Err(detail) => {
                let reason = DenialReason::classify(&detail);
                tracing::warn!("Media access refused ({}): {}", reason, detail);
                Err(PermissionDenial { reason, detail })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::FakeBackend;

    #[test]
    fn test_classify_signals() {
        let cases = [
            ("NotAllowedError", DenialReason::DeniedByUser),
            ("SecurityError", DenialReason::DeniedByUser),
            ("NotFoundError", DenialReason::NoDevice),
            ("OverconstrainedError", DenialReason::NoDevice),
            ("NotReadableError", DenialReason::DeviceInUse),
            ("TrackStartError", DenialReason::DeviceInUse),
            ("TypeError", DenialReason::Unknown),
        ];
        for (name, expected) in cases {
            let err = MediaAccessError::new(name, "x");
            assert_eq!(DenialReason::classify(&err), expected, "{name}");
        }
    }

    #[tokio::test]
    async fn test_request_grants_session() {
        let backend = FakeBackend::new();
        let controller = PermissionController::new(Arc::new(backend.clone()));
        let session = controller.request(&MediaConstraints::default()).await.unwrap();
        assert!(session.is_live());
        assert_eq!(backend.request_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_denied() {
        let backend = FakeBackend::new();
        backend.script_request(Err(MediaAccessError::new("NotAllowedError", "Permission denied")));
        let controller = PermissionController::new(Arc::new(backend.clone()));

        let denial = controller.request(&MediaConstraints::default()).await.unwrap_err();
        assert_eq!(denial.reason, DenialReason::DeniedByUser);
        assert!(denial.message().contains("access denied"));
        assert!(backend.streams().is_empty());
    }
}
