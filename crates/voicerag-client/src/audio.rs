// Audio I/O: PCM16 base64 framing, a WAV-backed recorder, and a queued
// player whose output is drained into a WAV file.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::{AudioPlayer, AudioRecorder};

/// Rate the realtime endpoint expects for input and produces for output.
pub const SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PCM16 payload has odd length {0}")]
    OddLength(usize),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported WAV format in {path}: {message}")]
    UnsupportedFormat { path: PathBuf, message: String },

    #[error("audio task failed: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// PCM16 framing
// ---------------------------------------------------------------------------

/// Little-endian PCM16 samples as base64.
pub fn encode_pcm16(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

pub fn decode_pcm16(data: &str) -> Result<Vec<i16>, AudioError> {
    let bytes = STANDARD.decode(data)?;
    if bytes.len() % 2 != 0 {
        return Err(AudioError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

// ---------------------------------------------------------------------------
// WAV files
// ---------------------------------------------------------------------------

/// Read a 16-bit integer WAV as mono samples, averaging channels.
/// Returns the samples and the file's sample rate.
pub fn read_wav_pcm16(path: &Path) -> Result<(Vec<i16>, u32), AudioError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::UnsupportedFormat {
            path: path.to_path_buf(),
            message: format!(
                "need 16-bit integer samples, got {} bit {:?}",
                spec.bits_per_sample, spec.sample_format
            ),
        });
    }

    let interleaved = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    };

    debug!(
        "Read {} samples at {} Hz from {}",
        samples.len(),
        spec.sample_rate,
        path.display()
    );
    Ok((samples, spec.sample_rate))
}

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Plays a WAV file as if it were a microphone: fixed-size chunks sent at
/// real-time pace.
pub struct WavRecorder {
    path: Option<PathBuf>,
    sample_rate: u32,
    chunk_samples: usize,
    task: Option<JoinHandle<()>>,
}

impl WavRecorder {
    /// With no `path`, recording succeeds but captures nothing.
    pub fn new(path: Option<PathBuf>, sample_rate: u32, chunk_samples: usize) -> Self {
        Self {
            path,
            sample_rate,
            chunk_samples: chunk_samples.max(1),
            task: None,
        }
    }

    fn chunk_interval(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_samples as f64 / self.sample_rate.max(1) as f64)
    }

    pub fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[async_trait]
impl AudioRecorder for WavRecorder {
    async fn start(&mut self, sink: mpsc::Sender<Vec<i16>>) -> Result<(), AudioError> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let Some(path) = &self.path else {
            warn!("No input WAV configured, recording sends no audio");
            return Ok(());
        };

        let (samples, file_rate) = read_wav_pcm16(path)?;
        if file_rate != self.sample_rate {
            warn!(
                "{} is {} Hz but the session expects {} Hz",
                path.display(),
                file_rate,
                self.sample_rate
            );
        }
        info!(
            "Capturing {} samples from {} in chunks of {}",
            samples.len(),
            path.display(),
            self.chunk_samples
        );

        let chunk_samples = self.chunk_samples;
        let mut ticker = tokio::time::interval(self.chunk_interval());
        self.task = Some(tokio::spawn(async move {
            for chunk in samples.chunks(chunk_samples) {
                ticker.tick().await;
                if sink.send(chunk.to_vec()).await.is_err() {
                    debug!("Audio sink closed, capture ends early");
                    return;
                }
            }
            info!("Input WAV exhausted");
        }));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Capture stopped");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PlaybackBuffer {
    queued: VecDeque<i16>,
    played: usize,
}

/// Queue of synthesized speech awaiting output. Clones share the queue.
#[derive(Debug, Clone, Default)]
pub struct QueuedPlayer {
    buffer: Arc<Mutex<PlaybackBuffer>>,
}

impl QueuedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recovers the queue if a holder panicked.
    fn buffer(&self) -> MutexGuard<'_, PlaybackBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dequeue up to `max` samples for output.
    pub fn take(&self, max: usize) -> Vec<i16> {
        let mut buffer = self.buffer();
        let n = max.min(buffer.queued.len());
        let out: Vec<i16> = buffer.queued.drain(..n).collect();
        buffer.played += out.len();
        out
    }

    pub fn queued(&self) -> usize {
        self.buffer().queued.len()
    }

    /// Samples handed out by `take` since the last reset.
    pub fn played(&self) -> usize {
        self.buffer().played
    }
}

impl AudioPlayer for QueuedPlayer {
    fn reset(&mut self) {
        let mut buffer = self.buffer();
        buffer.queued.clear();
        buffer.played = 0;
    }

    fn play(&mut self, samples: &[i16]) {
        self.buffer().queued.extend(samples.iter().copied());
    }

    fn stop(&mut self) {
        let dropped = {
            let mut buffer = self.buffer();
            let n = buffer.queued.len();
            buffer.queued.clear();
            n
        };
        if dropped > 0 {
            debug!("Discarded {} queued samples", dropped);
        }
    }
}

/// Background task writing a player's output into a WAV file.
pub struct WavSink {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<usize, AudioError>>,
}

impl WavSink {
    /// Stop draining, finalize the file, and return the samples written.
    pub async fn finish(self) -> Result<usize, AudioError> {
        let _ = self.stop_tx.send(());
        self.handle
            .await
            .map_err(|e| AudioError::Task(e.to_string()))?
    }
}

/// Drain `player` in real time into a mono WAV at `path`.
pub fn spawn_wav_sink(
    player: QueuedPlayer,
    path: &Path,
    sample_rate: u32,
    chunk_samples: usize,
) -> Result<WavSink, AudioError> {
    let mut writer = WavWriter::create(path, mono_spec(sample_rate))?;
    let chunk_samples = chunk_samples.max(1);
    let period = Duration::from_secs_f64(chunk_samples as f64 / sample_rate.max(1) as f64);
    let (stop_tx, mut stop_rx) = oneshot::channel();
    info!("Writing assistant audio to {}", path.display());

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut written = 0usize;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for sample in player.take(chunk_samples) {
                        writer.write_sample(sample)?;
                        written += 1;
                    }
                }
                _ = &mut stop_rx => break,
            }
        }
        // Whatever is still queued at shutdown is flushed.
        for sample in player.take(usize::MAX) {
            writer.write_sample(sample)?;
            written += 1;
        }
        writer.finalize()?;
        info!("Wrote {} samples of assistant audio", written);
        Ok::<_, AudioError>(written)
    });

    Ok(WavSink { stop_tx, handle })
}
