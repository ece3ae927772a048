//! Scripted in-memory media backend
//!
//! Stands in for a real camera stack in tests. Every stream and recorder the
//! backend hands out keeps a probe so tests can push fragments, inject
//! encoder failures and count how often the stream was stopped.

use super::traits::{
    CaptureDevice, DeviceKind, MediaAccessError, MediaBackend, MediaConstraints, MediaRecorder,
    MediaStream, RecorderEvent, RecorderEvents, RecorderOptions, TrackKind,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Default)]
struct BackendState {
    supported_types: Vec<String>,
    devices: Vec<CaptureDevice>,
    grant_script: VecDeque<Result<(), MediaAccessError>>,
    enumerate_error: Option<MediaAccessError>,
    recorder_error: Option<MediaAccessError>,
    auto_fragment: Option<Bytes>,
    final_fragment: Option<Bytes>,
    ack_stop: bool,
    streams: Vec<FakeStreamProbe>,
    recorders: Vec<FakeRecorderProbe>,
}

/// In-memory [`MediaBackend`]
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
    request_calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    /// One camera, one microphone, grants every request
    pub fn new() -> Self {
        let state = BackendState {
            supported_types: vec!["video/webm".to_string(), "video/webm;codecs=vp9,opus".to_string()],
            devices: vec![
                device("cam-1", DeviceKind::VideoInput, "FaceTime HD Camera"),
                device("mic-1", DeviceKind::AudioInput, "Built-in Microphone"),
            ],
            ack_stop: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            request_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_supported_types(self, types: &[&str]) -> Self {
        self.state.lock().supported_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_devices(self, devices: Vec<CaptureDevice>) -> Self {
        self.state.lock().devices = devices;
        self
    }

    /// Queue the outcome of the next permission request. Unscripted
    /// requests are granted.
    pub fn script_request(&self, outcome: Result<(), MediaAccessError>) {
        self.state.lock().grant_script.push_back(outcome);
    }

    pub fn fail_enumeration(&self, error: MediaAccessError) {
        self.state.lock().enumerate_error = Some(error);
    }

    pub fn fail_recorder_creation(&self, error: MediaAccessError) {
        self.state.lock().recorder_error = Some(error);
    }

    /// Recorders started after this call emit `fragment` every timeslice
    /// while not paused.
    pub fn auto_emit(&self, fragment: impl Into<Bytes>) {
        self.state.lock().auto_fragment = Some(fragment.into());
    }

    /// Fragment flushed right before the stop acknowledgement
    pub fn flush_on_stop(&self, fragment: impl Into<Bytes>) {
        self.state.lock().final_fragment = Some(fragment.into());
    }

    /// When false, recorders never acknowledge stop
    pub fn acknowledge_stop(&self, ack: bool) {
        self.state.lock().ack_stop = ack;
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn streams(&self) -> Vec<FakeStreamProbe> {
        self.state.lock().streams.clone()
    }

    pub fn last_stream(&self) -> Option<FakeStreamProbe> {
        self.state.lock().streams.last().cloned()
    }

    pub fn recorders(&self) -> Vec<FakeRecorderProbe> {
        self.state.lock().recorders.clone()
    }

    pub fn last_recorder(&self) -> Option<FakeRecorderProbe> {
        self.state.lock().recorders.last().cloned()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub fn device(id: &str, kind: DeviceKind, label: &str) -> CaptureDevice {
    CaptureDevice {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        group_id: None,
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn request_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, MediaAccessError> {
        let n = self.request_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        if let Some(outcome) = state.grant_script.pop_front() {
            outcome?;
        }

        let pick = |kind: DeviceKind, wanted: Option<&str>| -> Result<Option<String>, MediaAccessError> {
            let mut candidates = state.devices.iter().filter(|d| d.kind == kind);
            match wanted {
                Some(id) => candidates
                    .find(|d| d.id == id)
                    .map(|d| Some(d.id.clone()))
                    .ok_or_else(|| {
                        MediaAccessError::new("OverconstrainedError", format!("No {kind} matches {id}"))
                    }),
                None => Ok(candidates.next().map(|d| d.id.clone())),
            }
        };
        let video = pick(DeviceKind::VideoInput, constraints.video.device_id())?;
        let audio = pick(DeviceKind::AudioInput, constraints.audio.device_id())?;
        if video.is_none() && audio.is_none() {
            return Err(MediaAccessError::new("NotFoundError", "Requested device not found"));
        }

        let probe = FakeStreamProbe {
            inner: Arc::new(StreamState {
                id: format!("stream-{n}"),
                video_device: video,
                audio_device: audio,
                video_enabled: AtomicBool::new(true),
                audio_enabled: AtomicBool::new(true),
                live: AtomicBool::new(true),
                stop_calls: AtomicUsize::new(0),
                track_queries: AtomicUsize::new(0),
            }),
        };
        state.streams.push(probe.clone());
        Ok(Box::new(FakeStream { inner: probe.inner }))
    }

    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, MediaAccessError> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        match &state.enumerate_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.devices.clone()),
        }
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.state.lock().supported_types.iter().any(|t| t == mime_type)
    }

    fn create_recorder(
        &self,
        stream: &dyn MediaStream,
        options: &RecorderOptions,
    ) -> Result<Box<dyn MediaRecorder>, MediaAccessError> {
        let mut state = self.state.lock();
        if let Some(error) = state.recorder_error.take() {
            return Err(error);
        }
        if !stream.is_live() {
            return Err(MediaAccessError::new("InvalidStateError", "Stream is not live"));
        }

        let probe = FakeRecorderProbe {
            inner: Arc::new(RecorderState {
                mime_type: options.mime_type.clone(),
                timeslice: options.timeslice,
                auto_fragment: state.auto_fragment.clone(),
                final_fragment: state.final_fragment.clone(),
                ack_stop: state.ack_stop,
                sender: Mutex::new(None),
                ticker: Mutex::new(None),
                paused: Arc::new(AtomicBool::new(false)),
                start_calls: AtomicUsize::new(0),
                pause_calls: AtomicUsize::new(0),
                resume_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
            }),
        };
        state.recorders.push(probe.clone());
        Ok(Box::new(FakeRecorder { inner: probe.inner }))
    }
}

struct StreamState {
    id: String,
    video_device: Option<String>,
    audio_device: Option<String>,
    video_enabled: AtomicBool,
    audio_enabled: AtomicBool,
    live: AtomicBool,
    stop_calls: AtomicUsize,
    track_queries: AtomicUsize,
}

impl StreamState {
    fn flag(&self, kind: TrackKind) -> &AtomicBool {
        match kind {
            TrackKind::Video => &self.video_enabled,
            TrackKind::Audio => &self.audio_enabled,
        }
    }

    fn device(&self, kind: TrackKind) -> Option<&String> {
        match kind {
            TrackKind::Video => self.video_device.as_ref(),
            TrackKind::Audio => self.audio_device.as_ref(),
        }
    }
}

struct FakeStream {
    inner: Arc<StreamState>,
}

impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn device_id(&self, kind: TrackKind) -> Option<String> {
        self.inner.track_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.device(kind).cloned()
    }

    fn has_track(&self, kind: TrackKind) -> bool {
        self.inner.track_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.device(kind).is_some()
    }

    fn is_enabled(&self, kind: TrackKind) -> bool {
        self.inner.flag(kind).load(Ordering::SeqCst)
    }

    fn set_enabled(&self, kind: TrackKind, enabled: bool) -> usize {
        if self.inner.device(kind).is_none() {
            return 0;
        }
        self.inner.flag(kind).store(enabled, Ordering::SeqCst);
        1
    }

    fn stop(&self) {
        self.inner.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }
}

/// Test-side view of a stream handed out by [`FakeBackend`]
#[derive(Clone)]
pub struct FakeStreamProbe {
    inner: Arc<StreamState>,
}

impl FakeStreamProbe {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn video_device(&self) -> Option<&str> {
        self.inner.video_device.as_deref()
    }

    pub fn audio_device(&self) -> Option<&str> {
        self.inner.audio_device.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.inner.flag(kind).load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }

    pub fn track_queries(&self) -> usize {
        self.inner.track_queries.load(Ordering::SeqCst)
    }
}

struct RecorderState {
    mime_type: String,
    timeslice: Duration,
    auto_fragment: Option<Bytes>,
    final_fragment: Option<Bytes>,
    ack_stop: bool,
    sender: Mutex<Option<mpsc::UnboundedSender<RecorderEvent>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    paused: Arc<AtomicBool>,
    start_calls: AtomicUsize,
    pause_calls: AtomicUsize,
    resume_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl RecorderState {
    fn send(&self, event: RecorderEvent) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

struct FakeRecorder {
    inner: Arc<RecorderState>,
}

impl MediaRecorder for FakeRecorder {
    fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    fn start(&mut self) -> Result<RecorderEvents, MediaAccessError> {
        self.inner.start_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(fragment) = self.inner.auto_fragment.clone() {
            let tx = tx.clone();
            let paused = self.inner.paused.clone();
            let period = self.inner.timeslice;
            let handle = tokio::spawn(async move {
                let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                loop {
                    ticks.tick().await;
                    if paused.load(Ordering::SeqCst) {
                        continue;
                    }
                    if tx.send(RecorderEvent::Fragment(fragment.clone())).is_err() {
                        break;
                    }
                }
            });
            *self.inner.ticker.lock() = Some(handle);
        }

        *self.inner.sender.lock() = Some(tx);
        Ok(rx)
    }

    fn pause(&mut self) -> Result<(), MediaAccessError> {
        self.inner.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), MediaAccessError> {
        self.inner.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MediaAccessError> {
        self.inner.stop_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ticker) = self.inner.ticker.lock().take() {
            ticker.abort();
        }
        if let Some(fragment) = self.inner.final_fragment.clone() {
            self.inner.send(RecorderEvent::Fragment(fragment));
        }
        if self.inner.ack_stop {
            self.inner.send(RecorderEvent::Stopped);
            self.inner.sender.lock().take();
        }
        Ok(())
    }
}

impl Drop for FakeRecorder {
    fn drop(&mut self) {
        if let Some(ticker) = self.inner.ticker.lock().take() {
            ticker.abort();
        }
    }
}

/// Test-side view of a recorder handed out by [`FakeBackend`]
#[derive(Clone)]
pub struct FakeRecorderProbe {
    inner: Arc<RecorderState>,
}

impl FakeRecorderProbe {
    /// Deliver a fragment. Returns false when nobody is listening.
    pub fn emit(&self, fragment: impl Into<Bytes>) -> bool {
        self.inner.send(RecorderEvent::Fragment(fragment.into()))
    }

    /// Report an encoder failure
    pub fn fail(&self, message: &str) -> bool {
        self.inner.send(RecorderEvent::Error(message.to_string()))
    }

    /// Stop on the recorder's own initiative (e.g. device unplugged)
    pub fn end(&self) -> bool {
        let sent = self.inner.send(RecorderEvent::Stopped);
        self.inner.sender.lock().take();
        sent
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.inner.start_calls.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.inner.pause_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.inner.resume_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }
}
