//! Shoutout capture - camera + microphone recording core.
//!
//! Acquires the camera and microphone, records one clip at a time with an
//! enforced maximum duration, assembles the encoded fragments into a single
//! artifact and hands it to an upload sink.

pub mod capture;
pub mod download;
pub mod metadata;
pub mod recorder;
pub mod upload;
pub mod utils;

pub use capture::{CaptureDevice, DenialReason, MediaBackend, TrackKind};
pub use recorder::{RecordedArtifact, RecorderConfig, RecordingController, RecordingEvent, SessionState};
pub use upload::{UploadOutcome, UploadSink};
pub use utils::error::{CaptureError, CaptureResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shoutout_capture=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Shoutout capture v{}", env!("CARGO_PKG_VERSION"));
    }
}
