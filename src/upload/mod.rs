//! Artifact upload
//!
//! Delivery of finished recordings to the external upload collaborator.

pub mod coordinator;
pub mod sink;

pub use coordinator::{UploadCoordinator, UploadOutcome, UploadStatus};
pub use sink::{FnUploadSink, UploadSink};
