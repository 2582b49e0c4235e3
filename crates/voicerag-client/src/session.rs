// Recording session control.
//
// Starting a session: session.update, then capture, then a fresh player.
// Stopping: capture first, then playback, then the server-side input buffer.
// The recording flag only flips once every step succeeded.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use voicerag_core::SessionConfig;

use crate::audio::{decode_pcm16, AudioError};
use crate::realtime::RealtimeError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Microphone capture. Chunks of PCM16 samples go to the sink given to
/// `start` until `stop`.
#[async_trait]
pub trait AudioRecorder: Send {
    async fn start(&mut self, sink: mpsc::Sender<Vec<i16>>) -> Result<(), AudioError>;
    async fn stop(&mut self) -> Result<(), AudioError>;
}

/// Speech output.
pub trait AudioPlayer: Send {
    /// Drop queued audio and start a new response stream.
    fn reset(&mut self);
    fn play(&mut self, samples: &[i16]);
    /// Drop queued audio.
    fn stop(&mut self);
}

/// Client-to-server control messages the session needs.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    async fn start_session(&self, session: &SessionConfig) -> Result<(), RealtimeError>;
    async fn add_user_audio(&self, samples: &[i16]) -> Result<(), RealtimeError>;
    async fn input_audio_buffer_clear(&self) -> Result<(), RealtimeError>;
}

pub struct SessionController {
    control: Box<dyn ControlChannel>,
    recorder: Box<dyn AudioRecorder>,
    player: Box<dyn AudioPlayer>,
    session: SessionConfig,
    audio_tx: mpsc::Sender<Vec<i16>>,
    recording: bool,
}

impl SessionController {
    /// `audio_tx` receives captured chunks while recording.
    pub fn new(
        control: Box<dyn ControlChannel>,
        recorder: Box<dyn AudioRecorder>,
        player: Box<dyn AudioPlayer>,
        session: SessionConfig,
        audio_tx: mpsc::Sender<Vec<i16>>,
    ) -> Self {
        Self {
            control,
            recorder,
            player,
            session,
            audio_tx,
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Start or stop recording. Returns the new recording state.
    pub async fn toggle(&mut self) -> Result<bool, SessionError> {
        if self.recording {
            self.recorder.stop().await?;
            self.player.stop();
            self.control.input_audio_buffer_clear().await?;
            self.recording = false;
            info!("Recording stopped");
        } else {
            self.control.start_session(&self.session).await?;
            self.recorder.start(self.audio_tx.clone()).await?;
            self.player.reset();
            self.recording = true;
            info!("Recording started");
        }
        Ok(self.recording)
    }

    /// Forward a captured chunk upstream. Chunks arriving after recording
    /// stopped are dropped.
    pub async fn forward_audio(&mut self, samples: &[i16]) -> Result<(), RealtimeError> {
        if !self.recording {
            debug!("Dropping {} samples captured after stop", samples.len());
            return Ok(());
        }
        self.control.add_user_audio(samples).await
    }

    /// Queue synthesized speech. Ignored unless recording.
    pub fn on_audio_delta(&mut self, delta: &str) -> Result<(), AudioError> {
        if !self.recording {
            debug!("Ignoring response audio while not recording");
            return Ok(());
        }
        let samples = decode_pcm16(delta)?;
        self.player.play(&samples);
        Ok(())
    }

    /// The user started talking over the assistant.
    pub fn on_speech_started(&mut self) {
        debug!("Speech started, interrupting playback");
        self.player.stop();
    }

    /// Tear down local capture after the connection is gone. Returns whether
    /// a recording was in progress.
    pub async fn abandon(&mut self) -> bool {
        if !self.recording {
            return false;
        }
        if let Err(e) = self.recorder.stop().await {
            warn!("Failed to stop capture: {e}");
        }
        self.player.stop();
        self.recording = false;
        info!("Recording abandoned");
        true
    }
}
