//! Microphone capture lifecycle feeding the audio chat endpoint.
//!
//! # Design
//! Two states, `Idle` and `Recording`. The device side (permissions, audio
//! mode, the capture itself) sits behind `AudioRecorder` so hosts plug in
//! their platform recorder and tests plug in a fake. The session owns the
//! recorder, so at most one capture is open at a time.
//!
//! Stopping hands the produced file to a caller-supplied delivery closure and
//! returns its result; nothing is delivered when the device produced no file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Platform microphone access.
pub trait AudioRecorder {
    /// Asks the user for microphone access. `Ok(false)` means denied.
    fn request_permission(&mut self) -> io::Result<bool>;

    /// Switches the audio session into a record-capable mode.
    fn configure_audio_mode(&mut self) -> io::Result<()>;

    fn start(&mut self) -> io::Result<()>;

    /// Stops capture, releases the device and reports where the recording was
    /// written, if anywhere.
    fn stop_and_unload(&mut self) -> io::Result<Option<PathBuf>>;
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("microphone permission is required to record audio")]
    PermissionDenied,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("could not start recording: {0}")]
    StartFailed(#[source] io::Error),

    #[error("could not save recording: {0}")]
    StopFailed(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

pub struct RecordingSession<R> {
    recorder: R,
    state: RecordingState,
    started_at: Option<Instant>,
}

impl<R: AudioRecorder> RecordingSession<R> {
    pub fn new(recorder: R) -> Self {
        Self {
            recorder,
            state: RecordingState::Idle,
            started_at: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Time since capture started; zero when idle.
    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|at| at.elapsed()).unwrap_or_default()
    }

    /// `Idle → Recording`. Stays idle when permission is denied or the device
    /// fails to start.
    pub fn start(&mut self) -> Result<(), RecordingError> {
        if self.is_recording() {
            return Err(RecordingError::AlreadyRecording);
        }
        match self.recorder.request_permission() {
            Ok(true) => {}
            Ok(false) => return Err(RecordingError::PermissionDenied),
            Err(e) => return Err(RecordingError::StartFailed(e)),
        }
        self.recorder
            .configure_audio_mode()
            .and_then(|()| self.recorder.start())
            .map_err(|e| {
                warn!(error = %e, "recording failed to start");
                RecordingError::StartFailed(e)
            })?;

        self.state = RecordingState::Recording;
        self.started_at = Some(Instant::now());
        debug!("recording started");
        Ok(())
    }

    /// `Recording → Idle`. Calling it while idle does nothing and returns
    /// `Ok(None)`. The state is idle afterwards even if teardown failed.
    pub fn stop<O>(&mut self, deliver: impl FnOnce(&Path) -> O) -> Result<Option<O>, RecordingError> {
        if !self.is_recording() {
            return Ok(None);
        }
        self.state = RecordingState::Idle;
        self.started_at = None;

        let file = self.recorder.stop_and_unload().map_err(|e| {
            warn!(error = %e, "recording failed to stop");
            RecordingError::StopFailed(e)
        })?;
        match file {
            Some(path) => {
                debug!(path = %path.display(), "recording finished");
                Ok(Some(deliver(&path)))
            }
            None => {
                debug!("recording produced no file");
                Ok(None)
            }
        }
    }

    /// The single record button: starts when idle, stops when recording.
    pub fn toggle<O>(&mut self, deliver: impl FnOnce(&Path) -> O) -> Result<Option<O>, RecordingError> {
        if self.is_recording() {
            self.stop(deliver)
        } else {
            self.start().map(|()| None)
        }
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }
}
