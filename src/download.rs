//! Local download of a finished recording
//!
//! The artifact is written to a temporary object, exposed through a
//! `file://` URL for the save mechanism, and released as soon as the save
//! has been triggered.

use crate::capture::capabilities::extension_for;
use crate::recorder::state::RecordedArtifact;
use crate::utils::error::CaptureResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Temporary object backing a download
pub struct ObjectUrl {
    url: String,
    file: NamedTempFile,
}

impl ObjectUrl {
    /// Write the artifact bytes to a fresh temporary object
    pub fn create(artifact: &RecordedArtifact) -> CaptureResult<Self> {
        let suffix = format!(".{}", extension_for(&artifact.mime_type));
        let mut file = tempfile::Builder::new()
            .prefix("shoutout-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(&artifact.blob)?;
        file.flush()?;

        let url = to_file_url(file.path());
        tracing::debug!("Created object URL {} ({} bytes)", url, artifact.size());
        Ok(Self { url, file })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temporary object
    pub fn revoke(self) -> CaptureResult<()> {
        tracing::debug!("Revoking object URL {}", self.url);
        self.file.close()?;
        Ok(())
    }
}

fn to_file_url(path: &Path) -> String {
    let encoded: Vec<String> = path
        .to_string_lossy()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("file://{}", encoded.join("/"))
}

/// Platform save mechanism
pub trait SaveHandler {
    /// Persist the object under the suggested name and return where it went
    fn save(&self, object: &ObjectUrl, file_name: &str) -> CaptureResult<PathBuf>;
}

/// Saves into a directory, never overwriting an existing file
pub struct DirectorySaveHandler {
    dir: PathBuf,
}

impl DirectorySaveHandler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn free_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let path = Path::new(file_name);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("recording");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("bin");
        (1..)
            .map(|n| self.dir.join(format!("{stem} ({n}).{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl SaveHandler for DirectorySaveHandler {
    fn save(&self, object: &ObjectUrl, file_name: &str) -> CaptureResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.free_path(file_name);
        std::fs::copy(object.path(), &target)?;
        tracing::info!("Saved recording to {:?}", target);
        Ok(target)
    }
}

/// File name offered to the user
pub fn suggested_file_name(artifact: &RecordedArtifact) -> String {
    format!(
        "recording-{}.{}",
        artifact.created_at.format("%Y%m%d-%H%M%S"),
        extension_for(&artifact.mime_type)
    )
}

/// Trigger a save of the artifact. The temporary object is released right
/// after the handler returns, whether or not it succeeded.
pub fn download_artifact(artifact: &RecordedArtifact, handler: &dyn SaveHandler) -> CaptureResult<PathBuf> {
    let object = ObjectUrl::create(artifact)?;
    let result = handler.save(&object, &suggested_file_name(artifact));
    if let Err(e) = object.revoke() {
        tracing::warn!("Failed to release download object: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::assembler::ChunkAssembler;
    use crate::utils::error::CaptureError;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    fn artifact() -> RecordedArtifact {
        let mut assembler = ChunkAssembler::new();
        assembler.begin_batch("video/webm;codecs=vp9,opus");
        assembler.append(Bytes::from_static(b"webm-bytes")).unwrap();
        assembler.finalize(None).unwrap()
    }

    /// Remembers the temp path it was given, then fails
    struct FailingHandler {
        seen: Mutex<Option<PathBuf>>,
    }

    impl SaveHandler for FailingHandler {
        fn save(&self, object: &ObjectUrl, _file_name: &str) -> CaptureResult<PathBuf> {
            assert!(object.as_str().starts_with("file://"));
            *self.seen.lock() = Some(object.path().to_path_buf());
            Err(CaptureError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }
    }

    #[test]
    fn test_download_copies_and_releases() {
        let dir = tempdir().unwrap();
        let handler = DirectorySaveHandler::new(dir.path());
        let clip = artifact();

        let first = download_artifact(&clip, &handler).unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), b"webm-bytes");
        assert!(first.to_string_lossy().ends_with(".webm"));

        let second = download_artifact(&clip, &handler).unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_object_released_even_when_save_fails() {
        let handler = FailingHandler { seen: Mutex::new(None) };
        assert!(download_artifact(&artifact(), &handler).is_err());
        let temp = handler.seen.lock().clone().unwrap();
        assert!(!temp.exists());
    }

    #[test]
    fn test_file_url_encodes_segments() {
        let url = to_file_url(Path::new("/tmp/my clip.webm"));
        assert_eq!(url, "file:///tmp/my%20clip.webm");
    }
}
