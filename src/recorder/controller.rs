//! Recording controller
//!
//! The session state machine. Owns the capture session and drives the
//! permission controller, device catalog, chunk assembler, duration guard
//! and upload coordinator through the recording lifecycle.
//!
//! Every operation is a total function of the current state: calls that do
//! not apply in the current state are logged and ignored.
//!
//! The controller does not run on its own. While a pass is in flight the
//! host must keep driving it with [`RecordingController::process_next_signal`]
//! or [`RecordingController::wait_for_stop`]: fragments are only collected
//! and the maximum duration only enforced when a signal is applied. A host
//! that falls behind gets the fragments recorded in the meantime in the
//! artifact, while `duration_seconds` stays clamped to the maximum.

use super::assembler::ChunkAssembler;
use super::events::{ControlSignal, RecordingEvent};
use super::guard::DurationGuard;
use super::state::{RecordedArtifact, RecorderConfig, SessionState, StopReason};
use crate::capture::{
    Capabilities, CaptureDevice, CaptureSession, DeviceCatalog, MediaBackend, MediaConstraints,
    PermissionController, RecorderEvent, RecorderOptions, TrackKind, TrackToggler,
};
use crate::download::{download_artifact, SaveHandler};
use crate::metadata::{MetadataProvider, RequestContext};
use crate::upload::{FnUploadSink, UploadCoordinator, UploadOutcome, UploadSink};
use crate::utils::error::{CaptureError, CaptureResult};
use bytes::Bytes;
use parking_lot::RwLock;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

type CompletionHook = Box<dyn Fn(&RecordedArtifact) + Send + Sync>;

const UPLOAD_INTERRUPTED: &str = "the upload was interrupted before it finished";

/// Moves the shared state to `UploadFailed` when an upload future is
/// dropped before it settles
struct UploadInFlight {
    state: Arc<RwLock<SessionState>>,
    settled: bool,
}

impl UploadInFlight {
    fn new(state: Arc<RwLock<SessionState>>) -> Self {
        Self { state, settled: false }
    }
}

impl Drop for UploadInFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.write();
        if *state == SessionState::Uploading {
            *state = SessionState::UploadFailed;
        }
    }
}

/// One message applied by [`RecordingController::process_next_signal`]
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Recorder(RecorderEvent),
    Control(ControlSignal),
}

/// Outcome of draining the recorder after a stop request
enum Drain {
    Acknowledged,
    TimedOut,
    Failed(String),
}

pub struct RecordingControllerBuilder {
    backend: Arc<dyn MediaBackend>,
    config: RecorderConfig,
    on_recording_complete: Option<CompletionHook>,
    upload_sink: Option<Arc<dyn UploadSink>>,
    metadata: Option<Arc<dyn MetadataProvider>>,
}

impl RecordingControllerBuilder {
    pub fn config(mut self, config: RecorderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_duration_seconds(mut self, seconds: f64) -> Self {
        self.config.max_duration_seconds = Some(seconds);
        self
    }

    /// Called once for every finalized recording
    pub fn on_recording_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RecordedArtifact) + Send + Sync + 'static,
    {
        self.on_recording_complete = Some(Box::new(hook));
        self
    }

    pub fn upload_sink(mut self, sink: Arc<dyn UploadSink>) -> Self {
        self.upload_sink = Some(sink);
        self
    }

    /// Upload through an async closure receiving the artifact bytes
    pub fn on_upload<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.upload_sink(Arc::new(FnUploadSink::new(f)))
    }

    pub fn metadata(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    pub fn build(self) -> CaptureResult<RecordingController> {
        self.config.validate()?;

        let capabilities = Capabilities::negotiate(self.backend.as_ref(), &self.config.preferred_mime_types);
        let (event_tx, _) = broadcast::channel(100);
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        Ok(RecordingController {
            permissions: PermissionController::new(self.backend.clone()),
            catalog: DeviceCatalog::new(self.backend.clone()),
            backend: self.backend,
            uploads: UploadCoordinator::new(self.config.upload_timeout()),
            config: self.config,
            capabilities,
            session: None,
            assembler: ChunkAssembler::new(),
            guard: DurationGuard::new(),
            upload_sink: self.upload_sink,
            on_recording_complete: self.on_recording_complete,
            metadata: self.metadata,
            state: Arc::new(RwLock::new(SessionState::Idle)),
            artifact: None,
            recording_id: None,
            last_error: None,
            control_tx,
            control_rx,
            event_tx,
        })
    }
}

/// Drives one capture session through its lifecycle
pub struct RecordingController {
    backend: Arc<dyn MediaBackend>,
    config: RecorderConfig,
    capabilities: Capabilities,
    permissions: PermissionController,
    catalog: DeviceCatalog,

    /// The only live capture session
    session: Option<CaptureSession>,

    assembler: ChunkAssembler,
    guard: DurationGuard,
    uploads: UploadCoordinator,
    upload_sink: Option<Arc<dyn UploadSink>>,
    on_recording_complete: Option<CompletionHook>,
    metadata: Option<Arc<dyn MetadataProvider>>,

    /// Current state, shared with observers
    state: Arc<RwLock<SessionState>>,

    /// Latest finalized recording
    artifact: Option<RecordedArtifact>,

    /// Batch id of the pass in flight
    recording_id: Option<Uuid>,

    /// Message for the last user-visible failure
    last_error: Option<String>,

    control_tx: mpsc::UnboundedSender<ControlSignal>,
    control_rx: mpsc::UnboundedReceiver<ControlSignal>,

    event_tx: broadcast::Sender<RecordingEvent>,
}

impl RecordingController {
    pub fn builder(backend: Arc<dyn MediaBackend>) -> RecordingControllerBuilder {
        RecordingControllerBuilder {
            backend,
            config: RecorderConfig::default(),
            on_recording_complete: None,
            upload_sink: None,
            metadata: None,
        }
    }

    /// Get the current session state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Shared handle to the state, for observers on other tasks
    pub fn state_handle(&self) -> Arc<RwLock<SessionState>> {
        self.state.clone()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn devices(&self) -> &[CaptureDevice] {
        self.catalog.list()
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    pub fn artifact(&self) -> Option<&RecordedArtifact> {
        self.artifact.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn request_context(&self) -> Option<RequestContext> {
        self.metadata.as_ref().and_then(|m| m.request_context())
    }

    /// Fragments collected so far in the current pass
    pub fn pending_fragments(&self) -> usize {
        self.assembler.fragment_count()
    }

    pub fn upload_status(&self) -> crate::upload::UploadStatus {
        self.uploads.status()
    }

    /// Recorded time in milliseconds: the running pass while capturing,
    /// otherwise the finalized artifact
    pub fn duration_ms(&self) -> f64 {
        if self.state().is_capturing() {
            self.assembler.elapsed().as_secs_f64() * 1000.0
        } else {
            self.artifact
                .as_ref()
                .map(|a| a.duration_seconds * 1000.0)
                .unwrap_or(0.0)
        }
    }

    fn set_state(&mut self, next: SessionState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        if previous != next {
            tracing::info!("Session state {} -> {}", previous, next);
            self.emit(RecordingEvent::StateChanged(next));
        }
    }

    fn emit(&self, event: RecordingEvent) {
        let _ = self.event_tx.send(event);
    }

    fn ignored(&self, operation: &str) -> bool {
        tracing::debug!("{} ignored in state {}", operation, self.state());
        false
    }

    fn report(&mut self, message: String) {
        self.emit(RecordingEvent::Error(message.clone()));
        self.last_error = Some(message);
    }

    /// Swap in a new session. The previous one is released first.
    fn install_session(&mut self, session: CaptureSession) {
        if let Some(mut previous) = self.session.take() {
            previous.release();
        }
        self.catalog
            .sync_selection(session.video_device_id(), session.audio_device_id());
        self.emit(RecordingEvent::DevicesChanged {
            video: session.video_device_id().map(str::to_string),
            audio: session.audio_device_id().map(str::to_string),
        });
        self.session = Some(session);
    }

    /// Ask for camera + microphone access and enumerate devices.
    ///
    /// Valid from `Idle`, and from `PermissionDenied` as a retry.
    pub async fn request_permission(&mut self) -> SessionState {
        if !matches!(self.state(), SessionState::Idle | SessionState::PermissionDenied(_)) {
            self.ignored("request_permission");
            return self.state();
        }

        if let Some(mut previous) = self.session.take() {
            previous.release();
        }
        self.set_state(SessionState::AcquiringPermission);

        let constraints = self.catalog.constraints();
        match self.permissions.request(&constraints).await {
            Ok(session) => {
                self.install_session(session);
                if let Err(e) = self.catalog.refresh(true).await {
                    tracing::warn!("Device enumeration failed: {}", e);
                }
                self.last_error = None;
                self.set_state(SessionState::Ready);
            }
            Err(denial) => {
                self.report(denial.message().to_string());
                self.set_state(SessionState::PermissionDenied(denial.reason));
            }
        }
        self.state()
    }

    /// Switch to another camera. Allowed outside of a recording pass.
    pub async fn select_video_device(&mut self, id: &str) -> CaptureResult<()> {
        self.switch_device(id, TrackKind::Video).await
    }

    /// Switch to another microphone. Allowed outside of a recording pass.
    pub async fn select_audio_device(&mut self, id: &str) -> CaptureResult<()> {
        self.switch_device(id, TrackKind::Audio).await
    }

    async fn switch_device(&mut self, id: &str, kind: TrackKind) -> CaptureResult<()> {
        self.recover_interrupted_upload();
        let state = self.state();
        if state.is_capturing() {
            tracing::warn!("Rejected {} device switch to {} while {}", kind, id, state);
            return Err(CaptureError::DeviceSwitchRejected(state));
        }
        let Some(current) = self.session.as_ref() else {
            return Err(CaptureError::PermissionRequired);
        };

        let constraints = match kind {
            TrackKind::Video => self.catalog.select_video_device(id)?,
            TrackKind::Audio => self.catalog.select_audio_device(id)?,
        };
        let video_enabled = current.is_enabled(TrackKind::Video);
        let audio_enabled = current.is_enabled(TrackKind::Audio);

        if let Some(mut previous) = self.session.take() {
            previous.release();
        }

        match self.permissions.request(&constraints).await {
            Ok(session) => {
                session.stream().set_enabled(TrackKind::Video, video_enabled);
                session.stream().set_enabled(TrackKind::Audio, audio_enabled);
                self.install_session(session);
                tracing::info!("Switched {} device to {} ({} kept)", kind, id, state);
                Ok(())
            }
            Err(denial) => {
                if let Some(artifact) = self.artifact.take() {
                    tracing::warn!("Recording {} dropped with the lost capture session", artifact.id);
                }
                self.uploads.reset();
                self.report(denial.message().to_string());
                self.set_state(SessionState::PermissionDenied(denial.reason));
                Err(CaptureError::PermissionDenial(denial.reason))
            }
        }
    }

    /// Flip the camera track. Returns the new flag.
    pub fn toggle_video(&mut self) -> Option<bool> {
        self.session.as_ref().and_then(TrackToggler::toggle_video)
    }

    /// Flip the microphone track. Returns the new flag.
    pub fn toggle_audio(&mut self) -> Option<bool> {
        self.session.as_ref().and_then(TrackToggler::toggle_audio)
    }

    /// Begin a recording pass. Valid from `Ready`, or from `Stopped` to
    /// record again (the previous artifact is superseded).
    ///
    /// Must be called from within a Tokio runtime: the duration guard
    /// spawns its timer task here. Panics otherwise.
    pub fn start(&mut self) -> bool {
        self.recover_interrupted_upload();
        if !matches!(self.state(), SessionState::Ready | SessionState::Stopped) {
            return self.ignored("start");
        }
        let Some(session) = self.session.as_mut() else {
            return self.ignored("start");
        };

        let options = RecorderOptions {
            mime_type: self.capabilities.mime_type.clone(),
            timeslice: self.config.timeslice(),
        };
        let started = self
            .backend
            .create_recorder(session.stream(), &options)
            .and_then(|mut recorder| {
                let events = recorder.start()?;
                Ok((recorder, events))
            });
        let (recorder, events) = match started {
            Ok(started) => started,
            Err(e) => {
                tracing::error!("Failed to start recorder: {}", e);
                self.report(format!(
                    "Recording could not start: {}. Your camera is still on, try again.",
                    e.message
                ));
                return false;
            }
        };
        session.attach_recorder(recorder, events);

        self.artifact = None;
        self.uploads.reset();
        self.last_error = None;

        let recording_id = self.assembler.begin_batch(&options.mime_type);
        self.recording_id = Some(recording_id);

        if let Some(max) = self.config.max_duration() {
            let control = self.control_tx.clone();
            self.guard.arm(max, move || {
                let _ = control.send(ControlSignal::DurationExpired { recording_id });
            });
        }

        self.set_state(SessionState::Recording);
        self.emit(RecordingEvent::Started { recording_id });
        tracing::info!("Recording {} started ({})", recording_id, options.mime_type);
        true
    }

    /// Pause the pass. The countdown freezes.
    pub fn pause(&mut self) -> bool {
        if self.state() != SessionState::Recording {
            return self.ignored("pause");
        }
        let Some(recorder) = self.session.as_mut().and_then(|s| s.recorder_mut()) else {
            return self.ignored("pause");
        };
        if let Err(e) = recorder.pause() {
            self.fail_recording(e.message);
            return false;
        }

        self.guard.pause();
        self.assembler.mark_paused();
        self.set_state(SessionState::Paused);
        self.emit(RecordingEvent::Paused);
        true
    }

    /// Resume a paused pass. The countdown continues.
    ///
    /// Like [`RecordingController::start`], needs a Tokio runtime to
    /// reschedule the duration guard.
    pub fn resume(&mut self) -> bool {
        if self.state() != SessionState::Paused {
            return self.ignored("resume");
        }
        let Some(recorder) = self.session.as_mut().and_then(|s| s.recorder_mut()) else {
            return self.ignored("resume");
        };
        if let Err(e) = recorder.resume() {
            self.fail_recording(e.message);
            return false;
        }

        self.assembler.mark_resumed();
        self.guard.resume();
        self.set_state(SessionState::Recording);
        self.emit(RecordingEvent::Resumed);
        true
    }

    /// Stop the pass and finalize the artifact. Devices stay live.
    pub async fn stop(&mut self) -> bool {
        if !self.state().is_capturing() {
            return self.ignored("stop");
        }
        self.finish(StopReason::User, false).await
    }

    /// Drop the finalized artifact and go back to `Ready`
    pub fn discard(&mut self) -> bool {
        self.recover_interrupted_upload();
        if !matches!(
            self.state(),
            SessionState::Stopped | SessionState::UploadFailed | SessionState::Uploaded
        ) {
            return self.ignored("discard");
        }
        if let Some(artifact) = self.artifact.take() {
            tracing::info!("Discarded recording {}", artifact.id);
        }
        self.uploads.reset();
        self.last_error = None;
        self.set_state(SessionState::Ready);
        true
    }

    /// Release every device and timer. Safe to call any number of times.
    pub fn teardown(&mut self) {
        self.guard.cancel();
        self.assembler.abandon();
        self.recording_id = None;
        if let Some(mut session) = self.session.take() {
            session.release();
        }
        while self.control_rx.try_recv().is_ok() {}
        self.artifact = None;
        self.uploads.reset();
        self.set_state(SessionState::Idle);
    }

    /// Wait for the next recorder or timer message and apply it.
    ///
    /// Without a running recorder only pending timer messages are applied;
    /// returns None when there is nothing in flight.
    pub async fn process_next_signal(&mut self) -> Option<Signal> {
        let events = self.session.as_mut().and_then(|s| s.events_mut());
        let signal = match events {
            Some(events) => tokio::select! {
                biased;
                Some(control) = self.control_rx.recv() => Signal::Control(control),
                event = events.recv() => Signal::Recorder(event.unwrap_or(RecorderEvent::Stopped)),
            },
            None => Signal::Control(self.control_rx.try_recv().ok()?),
        };
        self.apply(signal.clone()).await;
        Some(signal)
    }

    /// Keep applying messages until the current pass ends
    pub async fn wait_for_stop(&mut self) -> SessionState {
        while self.state().is_capturing() {
            if self.process_next_signal().await.is_none() {
                break;
            }
        }
        self.state()
    }

    async fn apply(&mut self, signal: Signal) {
        match signal {
            Signal::Recorder(RecorderEvent::Fragment(fragment)) => {
                let size = fragment.len();
                if !self.state().is_capturing() || self.assembler.append(fragment).is_err() {
                    tracing::warn!("Late fragment of {} bytes dropped", size);
                    self.emit(RecordingEvent::FragmentDropped { size });
                }
            }
            Signal::Recorder(RecorderEvent::Error(message)) => {
                if self.state().is_capturing() {
                    self.fail_recording(message);
                }
            }
            Signal::Recorder(RecorderEvent::Stopped) => {
                if self.state().is_capturing() {
                    tracing::warn!("Recorder stopped on its own");
                    self.finish(StopReason::RecorderEnded, true).await;
                }
            }
            Signal::Control(ControlSignal::DurationExpired { recording_id }) => {
                if self.recording_id == Some(recording_id) && self.state().is_capturing() {
                    self.finish(StopReason::MaxDuration, false).await;
                } else {
                    tracing::debug!("Stale duration expiry for {}", recording_id);
                }
            }
        }
    }

    /// Common stop path for manual stop, auto-stop and recorder end
    async fn finish(&mut self, reason: StopReason, recorder_done: bool) -> bool {
        self.guard.cancel();

        if !recorder_done {
            match self.drain_recorder().await {
                Drain::Acknowledged => {}
                Drain::TimedOut => {
                    tracing::warn!(
                        "Recorder did not acknowledge stop within {:?}, finalizing what arrived",
                        self.config.stop_ack_timeout()
                    );
                }
                Drain::Failed(message) => {
                    self.fail_recording(message);
                    return false;
                }
            }
        }
        if let Some(session) = self.session.as_mut() {
            session.detach_recorder();
        }
        self.recording_id = None;

        let Some(artifact) = self.assembler.finalize(self.config.max_duration()) else {
            self.fail_recording("no recording data was captured".to_string());
            return false;
        };

        tracing::info!(
            "Recording {} stopped ({:?}): {:.2}s, {} bytes",
            artifact.id,
            reason,
            artifact.duration_seconds,
            artifact.size()
        );
        self.set_state(SessionState::Stopped);
        if let Some(hook) = &self.on_recording_complete {
            hook(&artifact);
        }
        self.emit(RecordingEvent::Stopped {
            duration_seconds: artifact.duration_seconds,
            size: artifact.size(),
            reason,
        });
        self.artifact = Some(artifact);
        true
    }

    /// Request stop and collect fragments until the recorder acknowledges
    async fn drain_recorder(&mut self) -> Drain {
        let Some(session) = self.session.as_mut() else {
            return Drain::Acknowledged;
        };
        if let Some(recorder) = session.recorder_mut() {
            if let Err(e) = recorder.stop() {
                return Drain::Failed(e.message);
            }
        }
        let Some(events) = session.events_mut() else {
            return Drain::Acknowledged;
        };

        let deadline = tokio::time::Instant::now() + self.config.stop_ack_timeout();
        loop {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Some(RecorderEvent::Fragment(fragment))) => {
                    if let Err(e) = self.assembler.append(fragment) {
                        tracing::warn!("{}", e);
                    }
                }
                Ok(Some(RecorderEvent::Error(message))) => return Drain::Failed(message),
                Ok(Some(RecorderEvent::Stopped)) | Ok(None) => return Drain::Acknowledged,
                Err(_) => return Drain::TimedOut,
            }
        }
    }

    /// Abort the current pass after an encoder failure. Devices stay live.
    fn fail_recording(&mut self, message: String) {
        tracing::error!("Recording failed: {}", message);
        self.guard.cancel();
        self.assembler.abandon();
        self.recording_id = None;
        if let Some(session) = self.session.as_mut() {
            session.detach_recorder();
        }
        let error = CaptureError::EncoderFailure(message);
        self.report(format!("{error}. Your camera is still on, press record to try again."));
        self.set_state(SessionState::Ready);
    }

    /// Send the artifact to the upload sink. Valid from `Stopped`.
    pub async fn upload(&mut self) -> Option<UploadOutcome> {
        self.recover_interrupted_upload();
        if self.state() != SessionState::Stopped {
            self.ignored("upload");
            return None;
        }
        let Some(sink) = self.upload_sink.clone() else {
            tracing::warn!("Upload requested but no upload sink is configured");
            self.report("Uploading is not available right now.".to_string());
            return None;
        };
        let artifact = self.artifact.clone()?;

        self.set_state(SessionState::Uploading);
        self.emit(RecordingEvent::Upload(self.uploads.status()));
        let mut in_flight = UploadInFlight::new(self.state.clone());
        let outcome = self.uploads.upload(artifact, sink).await;
        in_flight.settled = true;
        self.settle_upload(&outcome);
        Some(outcome)
    }

    /// Re-send the same artifact after a failed upload
    pub async fn retry_upload(&mut self) -> Option<UploadOutcome> {
        self.recover_interrupted_upload();
        if self.state() != SessionState::UploadFailed {
            self.ignored("retry_upload");
            return None;
        }
        self.set_state(SessionState::Uploading);
        let mut in_flight = UploadInFlight::new(self.state.clone());
        let retried = self.uploads.retry().await;
        in_flight.settled = true;
        match retried {
            Some(outcome) => {
                self.settle_upload(&outcome);
                Some(outcome)
            }
            None => {
                self.set_state(SessionState::UploadFailed);
                None
            }
        }
    }

    /// An upload future dropped mid-flight leaves the attempt open. Close it
    /// before any operation that can follow an upload.
    fn recover_interrupted_upload(&mut self) {
        if !self.uploads.interrupt(UPLOAD_INTERRUPTED) {
            return;
        }
        self.emit(RecordingEvent::Upload(self.uploads.status()));
        let error = CaptureError::UploadFailure(UPLOAD_INTERRUPTED.to_string());
        self.report(format!("{error}. Your recording is safe, try again."));

        // The drop guard may already have moved the shared state without
        // notifying subscribers.
        *self.state.write() = SessionState::UploadFailed;
        tracing::info!("Session state -> {}", SessionState::UploadFailed);
        self.emit(RecordingEvent::StateChanged(SessionState::UploadFailed));
    }

    fn settle_upload(&mut self, outcome: &UploadOutcome) {
        self.emit(RecordingEvent::Upload(self.uploads.status()));
        if outcome.ok {
            self.last_error = None;
            self.set_state(SessionState::Uploaded);
        } else {
            let error = CaptureError::UploadFailure(outcome.error.clone().unwrap_or_default());
            self.report(format!("{error}. Your recording is safe, try again."));
            self.set_state(SessionState::UploadFailed);
        }
    }

    /// Save the artifact locally through the given save mechanism
    pub fn download(&self, handler: &dyn SaveHandler) -> CaptureResult<PathBuf> {
        match &self.artifact {
            Some(artifact) => download_artifact(artifact, handler),
            None => Err(CaptureError::NoArtifact),
        }
    }

    /// Constraints for the current device selection
    pub fn constraints(&self) -> MediaConstraints {
        self.catalog.constraints()
    }

    /// Time left before the duration guard stops the pass
    pub fn remaining(&self) -> Option<Duration> {
        if !self.state().is_capturing() || !self.guard.is_armed() {
            return None;
        }
        Some(self.guard.remaining())
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.guard.cancel();
        if let Some(mut session) = self.session.take() {
            session.release();
        }
    }
}
