//! Error types and handling
//!
//! Common error types used across the capture core.

use crate::capture::permissions::DenialReason;
use crate::recorder::state::SessionState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture-wide error type
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("{}", .0.message())]
    PermissionDenial(DenialReason),

    #[error("Camera and microphone access has not been granted yet")]
    PermissionRequired,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Cannot switch devices while {0}; stop the recording first")]
    DeviceSwitchRejected(SessionState),

    #[error("Fragment arrived after the recording was finalized")]
    LateFragment,

    #[error("Recording failed: {0}")]
    EncoderFailure(String),

    #[error("Upload failed: {0}")]
    UploadFailure(String),

    #[error("There is no finished recording")]
    NoArtifact,

    #[error("Media backend error: {0}")]
    Backend(#[from] crate::capture::traits::MediaAccessError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response for the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&CaptureError> for ErrorResponse {
    fn from(error: &CaptureError) -> Self {
        let code = match error {
            CaptureError::PermissionDenial(_) => "PERMISSION_DENIED",
            CaptureError::PermissionRequired => "PERMISSION_REQUIRED",
            CaptureError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            CaptureError::DeviceSwitchRejected(_) => "DEVICE_SWITCH_REJECTED",
            CaptureError::LateFragment => "LATE_FRAGMENT",
            CaptureError::EncoderFailure(_) => "ENCODER_FAILURE",
            CaptureError::NoArtifact => "NO_ARTIFACT",
            CaptureError::UploadFailure(_) => "UPLOAD_FAILURE",
            CaptureError::Backend(_) => "BACKEND_ERROR",
            CaptureError::Config(_) => "CONFIG_ERROR",
            CaptureError::Serialization(_) => "SERIALIZATION_ERROR",
            CaptureError::Io(_) => "IO_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<CaptureError> for ErrorResponse {
    fn from(error: CaptureError) -> Self {
        ErrorResponse::from(&error)
    }
}

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denial_message_is_actionable() {
        let err = CaptureError::PermissionDenial(DenialReason::DeniedByUser);
        let response = ErrorResponse::from(err);
        assert_eq!(response.code, "PERMISSION_DENIED");
        assert!(response.message.starts_with("Camera and microphone access denied"));
    }

    #[test]
    fn test_switch_rejection_names_state() {
        let err = CaptureError::DeviceSwitchRejected(SessionState::Recording);
        assert!(err.to_string().contains("recording"));
    }
}
