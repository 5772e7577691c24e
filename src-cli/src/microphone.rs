//! Microphone capture through cpal.
//!
//! The input stream pushes every callback buffer into a [`ChunkRecorder`];
//! the stream is dropped on Ctrl+C or when the duration limit is reached and
//! the chunks are assembled into one WAV file.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use reflect_common::capture::{CaptureError, ChunkRecorder, RecordedAudio};
use tracing::{debug, error, info};

use crate::colors;

#[derive(Debug)]
pub enum MicrophoneError {
    /// No default input device
    NoDevice,
    /// Device configuration could not be read or is unsupported
    Config(String),
    /// Stream could not be built or started
    Stream(String),
    Capture(CaptureError),
}

impl std::fmt::Display for MicrophoneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MicrophoneError::NoDevice => write!(f, "No microphone found"),
            MicrophoneError::Config(e) => write!(f, "Microphone configuration error: {}", e),
            MicrophoneError::Stream(e) => write!(f, "Could not start recording: {}", e),
            MicrophoneError::Capture(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MicrophoneError {}

impl From<CaptureError> for MicrophoneError {
    fn from(e: CaptureError) -> Self {
        MicrophoneError::Capture(e)
    }
}

fn push(recorder: &Mutex<ChunkRecorder>, chunk: &[f32]) {
    if let Ok(mut recorder) = recorder.lock() {
        recorder.push(chunk);
    }
}

fn build_stream(
    device: &cpal::Device,
    supported: &cpal::SupportedStreamConfig,
    recorder: Arc<Mutex<ChunkRecorder>>,
) -> Result<cpal::Stream, MicrophoneError> {
    let config: cpal::StreamConfig = supported.config();
    let err_fn = |err: cpal::StreamError| error!("Audio capture error: {}", err);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| push(&recorder, data),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let chunk: Vec<f32> = data.iter().map(|s| *s as f32 / i16::MAX as f32).collect();
                push(&recorder, &chunk);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let chunk: Vec<f32> = data
                    .iter()
                    .map(|s| (*s as f32 - 32768.0) / 32768.0)
                    .collect();
                push(&recorder, &chunk);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(MicrophoneError::Config(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };
    stream.map_err(|e| MicrophoneError::Stream(e.to_string()))
}

/// Record until Ctrl+C or `max_secs`, whichever comes first.
pub async fn record(max_secs: Option<u64>, show_progress: bool) -> Result<RecordedAudio, MicrophoneError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(MicrophoneError::NoDevice)?;
    let supported = device
        .default_input_config()
        .map_err(|e| MicrophoneError::Config(e.to_string()))?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();

    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate,
        channels,
        "Starting microphone capture"
    );

    let recorder = Arc::new(Mutex::new(ChunkRecorder::new(sample_rate, channels)));
    let stream = build_stream(&device, &supported, recorder.clone())?;
    stream
        .play()
        .map_err(|e| MicrophoneError::Stream(e.to_string()))?;

    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                let elapsed = started.elapsed().as_secs();
                if show_progress {
                    print!(
                        "\r{} {}",
                        colors::recording("REC"),
                        colors::elapsed_time(elapsed / 60, elapsed % 60)
                    );
                    let _ = std::io::stdout().flush();
                }
                if max_secs.is_some_and(|max| elapsed >= max) {
                    break;
                }
            }
        }
    }
    if show_progress {
        println!();
    }

    // Releases the device
    drop(stream);

    let recorder = {
        let mut guard = recorder
            .lock()
            .map_err(|_| MicrophoneError::Stream("capture buffer poisoned".into()))?;
        std::mem::replace(&mut *guard, ChunkRecorder::new(sample_rate, channels))
    };
    debug!(
        chunks = recorder.chunk_count(),
        samples = recorder.sample_count(),
        "Microphone capture stopped"
    );
    Ok(recorder.finish()?)
}
