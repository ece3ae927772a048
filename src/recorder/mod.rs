//! Recording system module
//!
//! This module implements the recording lifecycle:
//! - RecordingController state machine driving one capture session
//! - ChunkAssembler collecting encoded fragments into an artifact
//! - DurationGuard enforcing the maximum recording length

pub mod assembler;
pub mod controller;
pub mod events;
pub mod guard;
pub mod state;

pub use assembler::ChunkAssembler;
pub use controller::{RecordingController, RecordingControllerBuilder, Signal};
pub use events::{ControlSignal, RecordingEvent};
pub use guard::DurationGuard;
pub use state::{RecordedArtifact, RecorderConfig, RecordingSegment, SessionState, StopReason};
