//! Recorder capability negotiation
//!
//! Resolves once, at session init, what the backend can record so the state
//! machine never branches on platform support.

use super::traits::MediaBackend;

/// Used when the backend accepts none of the preferred types; the recorder
/// then picks its own container.
pub const FALLBACK_MIME_TYPE: &str = "video/webm";

/// What the selected backend can do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Backend name
    pub backend: String,

    /// Mime type every recorder in this session will use
    pub mime_type: String,
}

impl Capabilities {
    /// Pick the first preferred mime type the backend supports
    pub fn negotiate(backend: &dyn MediaBackend, preferred: &[String]) -> Self {
        let mime_type = preferred
            .iter()
            .find(|candidate| backend.is_type_supported(candidate))
            .cloned()
            .unwrap_or_else(|| {
                tracing::warn!(
                    "Backend {} supports none of {:?}, falling back to {}",
                    backend.name(),
                    preferred,
                    FALLBACK_MIME_TYPE
                );
                FALLBACK_MIME_TYPE.to_string()
            });

        tracing::info!("Negotiated recorder mime type {} on {}", mime_type, backend.name());

        Self {
            backend: backend.name().to_string(),
            mime_type,
        }
    }

    /// File extension for the negotiated container
    pub fn extension(&self) -> &'static str {
        extension_for(&self.mime_type)
    }
}

/// File extension for a mime type such as `video/webm;codecs=vp9`
pub fn extension_for(mime_type: &str) -> &'static str {
    let container = mime_type.split(';').next().unwrap_or_default().trim();
    match container {
        "video/webm" | "audio/webm" => "webm",
        "video/mp4" | "audio/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::FakeBackend;

    #[test]
    fn test_negotiate_picks_first_supported() {
        let backend = FakeBackend::new().with_supported_types(&["video/webm", "video/mp4"]);
        let preferred = vec![
            "video/webm;codecs=vp9,opus".to_string(),
            "video/mp4".to_string(),
            "video/webm".to_string(),
        ];
        let caps = Capabilities::negotiate(&backend, &preferred);
        assert_eq!(caps.mime_type, "video/mp4");
        assert_eq!(caps.extension(), "mp4");
    }

    #[test]
    fn test_negotiate_falls_back() {
        let backend = FakeBackend::new().with_supported_types(&[]);
        let caps = Capabilities::negotiate(&backend, &["video/mp4".to_string()]);
        assert_eq!(caps.mime_type, FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("video/webm;codecs=vp8,opus"), "webm");
        assert_eq!(extension_for("video/quicktime"), "bin");
    }
}
