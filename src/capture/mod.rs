//! Camera and microphone capture
//!
//! This module wraps the media capability provider: permission requests,
//! device enumeration, track toggling and the live capture session.

pub mod capabilities;
pub mod devices;
pub mod permissions;
pub mod session;
pub mod tracks;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use capabilities::Capabilities;
pub use devices::DeviceCatalog;
pub use permissions::{DenialReason, PermissionController, PermissionDenial};
pub use session::CaptureSession;
pub use tracks::TrackToggler;
pub use traits::{
    CaptureDevice, DeviceConstraint, DeviceKind, MediaAccessError, MediaBackend, MediaConstraints,
    MediaRecorder, MediaStream, RecorderEvent, RecorderEvents, RecorderOptions, TrackKind,
};
