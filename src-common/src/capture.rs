//! Assembly of captured microphone audio into a single WAV upload.
//!
//! The capture backend pushes PCM chunks as they arrive; nothing is encoded
//! until [`ChunkRecorder::finish`] turns the accumulated samples into one WAV
//! file.

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::api::AudioUpload;

/// MIME type of assembled recordings.
pub const RECORDING_MIME: &str = "audio/wav";

/// Error type for recording assembly.
#[derive(Debug)]
pub enum CaptureError {
    /// Nothing was captured
    Empty,
    /// Sample rate or channel count is zero
    InvalidFormat { sample_rate: u32, channels: u16 },
    /// WAV encoding failed
    Encode(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Empty => write!(f, "No audio was recorded"),
            CaptureError::InvalidFormat {
                sample_rate,
                channels,
            } => write!(
                f,
                "Invalid audio format: {} Hz, {} channel(s)",
                sample_rate, channels
            ),
            CaptureError::Encode(e) => write!(f, "Failed to encode recording: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<hound::Error> for CaptureError {
    fn from(e: hound::Error) -> Self {
        CaptureError::Encode(e.to_string())
    }
}

/// A finished recording ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
}

impl RecordedAudio {
    pub fn into_upload(self, language: &str) -> AudioUpload {
        AudioUpload::new(self.file_name, RECORDING_MIME, self.bytes, language)
    }
}

/// `recording_<unix-ms>.wav`
pub fn recording_file_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("recording_{}.wav", millis)
}

/// Accumulates interleaved f32 PCM chunks.
#[derive(Debug, Clone)]
pub struct ChunkRecorder {
    sample_rate: u32,
    channels: u16,
    chunks: Vec<Vec<f32>>,
}

impl ChunkRecorder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            chunks: Vec::new(),
        }
    }

    /// Append a chunk. Empty chunks are ignored.
    pub fn push(&mut self, chunk: &[f32]) {
        if !chunk.is_empty() {
            self.chunks.push(chunk.to_vec());
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn sample_count(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Encode everything captured so far as 16-bit PCM WAV.
    pub fn finish(self) -> Result<RecordedAudio, CaptureError> {
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(CaptureError::InvalidFormat {
                sample_rate: self.sample_rate,
                channels: self.channels,
            });
        }
        if self.is_empty() {
            return Err(CaptureError::Empty);
        }

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let duration_secs = self.duration_secs();

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in self.chunks.iter().flatten() {
                let clamped = sample.clamp(-1.0, 1.0);
                writer.write_sample((clamped * i16::MAX as f32) as i16)?;
            }
            writer.finalize()?;
        }

        let bytes = cursor.into_inner();
        debug!(
            chunks = self.chunks.len(),
            bytes = bytes.len(),
            duration_secs,
            "Assembled recording"
        );
        Ok(RecordedAudio {
            file_name: recording_file_name(SystemTime::now()),
            bytes,
            duration_secs,
        })
    }
}
