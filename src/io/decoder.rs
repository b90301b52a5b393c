//! Audio decoding using Symphonia
//!
//! Files are decoded packet by packet, down-mixed to mono as they arrive and
//! finally resampled to the analysis rate.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::resample::resample_mono;
use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::interleaved_to_mono;

/// Decoding options
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Output sample rate; `None` keeps the file's native rate (default: 22050)
    pub target_sample_rate: Option<u32>,

    /// Stop after this many seconds of audio (default: whole file)
    pub max_duration_secs: Option<f32>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            target_sample_rate: Some(22050),
            max_duration_secs: None,
        }
    }
}

/// Mono PCM decoded from a file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate of `samples`
    pub sample_rate: u32,

    /// Native sample rate of the file
    pub source_sample_rate: u32,

    /// Channel count of the file before down-mixing
    pub channels: usize,
}

impl DecodedAudio {
    /// Duration of the decoded audio in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode audio file to mono PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file (MP3, FLAC, WAV, OGG, M4A, ...)
/// * `options` - Target sample rate and optional duration limit
///
/// # Errors
///
/// Returns `AnalysisError::Io` if the file cannot be opened and
/// `AnalysisError::DecodingError` if the container or codec is unsupported.
pub fn decode_audio(path: &Path, options: &DecodeOptions) -> Result<DecodedAudio, AnalysisError> {
    log::debug!("Decoding audio file: {}", path.display());

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::DecodingError(format!("Unsupported format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            AnalysisError::DecodingError("No supported audio tracks found".to_string())
        })?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::DecodingError("Sample rate not specified".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::DecodingError(format!("Failed to create decoder: {}", e)))?;

    let max_frames = options
        .max_duration_secs
        .map(|secs| (secs.max(0.0) * source_sample_rate as f32) as usize);

    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut mono: Vec<f32> = Vec::new();

    loop {
        if let Some(limit) = max_frames {
            if mono.len() >= limit {
                break;
            }
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AnalysisError::DecodingError(format!(
                    "Failed to read packet: {}",
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupted packets are skipped
                log::warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                return Err(AnalysisError::DecodingError(format!(
                    "Failed to decode packet: {}",
                    e
                )))
            }
        };

        let spec = *decoded.spec();
        channels = spec.channels.count();
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        mono.extend_from_slice(&interleaved_to_mono(buf.samples(), channels));
    }

    if let Some(limit) = max_frames {
        mono.truncate(limit);
    }

    if mono.is_empty() {
        return Err(AnalysisError::DecodingError(format!(
            "No audio frames decoded from {}",
            path.display()
        )));
    }

    let (samples, sample_rate) = match options.target_sample_rate {
        Some(target) if target != source_sample_rate => {
            (resample_mono(&mono, source_sample_rate, target)?, target)
        }
        _ => (mono, source_sample_rate),
    };

    log::debug!(
        "Decoded {} mono samples at {} Hz (source {} Hz, {} channels)",
        samples.len(),
        sample_rate,
        source_sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        source_sample_rate,
        channels,
    })
}
