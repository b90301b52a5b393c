//! Sample-rate conversion using Rubato sinc interpolation

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::AnalysisError;

/// Input frames fed to the resampler per call
const CHUNK_SIZE: usize = 8192;

/// Resample mono samples from `from_rate` to `to_rate`
///
/// The resampler's group delay is removed so the output lines up with the
/// input, and the output length is `ceil(len * to_rate / from_rate)`. Input is
/// fed in fixed chunks, zero padded past the end, so short clips still fill
/// the filter.
pub fn resample_mono(
    samples: &[f32],
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>, AnalysisError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid sample rates for resampling: {} -> {}",
            from_rate, to_rate
        )));
    }

    if samples.is_empty() || from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| AnalysisError::ProcessingError(format!("Failed to create resampler: {}", e)))?;

    let expected_len = (samples.len() as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();
    let target = expected_len + delay;
    let mut output: Vec<f32> = Vec::with_capacity(target + CHUNK_SIZE);
    let mut buffer: Vec<f32> = Vec::with_capacity(CHUNK_SIZE);

    let mut pos = 0usize;
    while output.len() < target {
        let n = resampler.input_frames_next();
        buffer.clear();
        buffer.resize(n, 0.0);
        if pos < samples.len() {
            let take = n.min(samples.len() - pos);
            buffer[..take].copy_from_slice(&samples[pos..pos + take]);
        }
        pos += n;

        let chunk: [&[f32]; 1] = [&buffer[..]];
        let out = resampler
            .process(&chunk[..], None)
            .map_err(|e| AnalysisError::ProcessingError(format!("Resampling failed: {}", e)))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    output.truncate(target);
    let start = delay.min(output.len());

    log::debug!(
        "Resampled {} samples ({} Hz) -> {} samples ({} Hz)",
        samples.len(),
        from_rate,
        output.len() - start,
        to_rate
    );

    Ok(output.split_off(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1f32, -0.2, 0.3];
        let out = resample_mono(&samples, 22050, 22050).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(resample_mono(&[0.0; 10], 0, 22050).is_err());
        assert!(resample_mono(&[0.0; 10], 44100, 0).is_err());
    }

    #[test]
    fn test_short_inputs_keep_their_length() {
        assert_eq!(resample_mono(&[0.1, 0.2, 0.3], 44100, 22050).unwrap().len(), 2);
        assert_eq!(resample_mono(&[0.5], 48000, 22050).unwrap().len(), 1);
        assert_eq!(resample_mono(&[0.0; 10], 22050, 44100).unwrap().len(), 20);
    }

    #[test]
    fn test_downsample_length_and_tone() {
        // 1 second of 440 Hz at 44.1 kHz -> 22.05 kHz
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        let out = resample_mono(&samples, 44100, 22050).unwrap();

        assert!(
            (out.len() as i64 - 22050).abs() <= 2,
            "expected ~22050 samples, got {}",
            out.len()
        );

        // Energy of a sine survives resampling (RMS of 0.5 amplitude sine ~0.354)
        let mid = &out[2000..20000];
        let rms = (mid.iter().map(|x| x * x).sum::<f32>() / mid.len() as f32).sqrt();
        assert!((rms - 0.354).abs() < 0.05, "unexpected RMS {}", rms);
    }
}
