//! Local autocorrelation tempogram
//!
//! Every frame of the onset envelope gets its own windowed autocorrelation,
//! so tempo can be read per frame and then aggregated.
//!
//! # Algorithm
//!
//! 1. Take `win_length` envelope frames centred on frame `t` (zero outside)
//! 2. Weight them with a periodic Hann window
//! 3. Autocorrelate with FFT acceleration: `ACF = IFFT(|FFT(x)|²)`
//! 4. Normalise so the maximum over lags is 1
//!
//! # Reference
//!
//! Grosche, P., Müller, M., & Kurth, F. (2010). Cyclic Tempogram: A Mid-Level Tempo
//! Representation for Music Signals. *Proceedings of ICASSP*.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;
use crate::features::spectrum::hann_window;

const EPSILON: f32 = 1e-10;

/// Compute the autocorrelation tempogram of an onset envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength envelope
/// * `win_length` - Window length in frames (also the number of lags)
///
/// # Returns
///
/// One row of `win_length` lag values per envelope frame. Rows whose window
/// holds no energy are all zero.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `win_length` is 0.
pub fn autocorrelation_tempogram(
    envelope: &[f32],
    win_length: usize,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    if win_length == 0 {
        return Err(AnalysisError::InvalidInput(
            "Tempogram window length must be > 0".to_string(),
        ));
    }
    if envelope.is_empty() {
        return Ok(Vec::new());
    }

    let window = hann_window(win_length);
    let half = win_length / 2;
    let fft_size = (2 * win_length).next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];

    let mut tempogram = Vec::with_capacity(envelope.len());
    for t in 0..envelope.len() {
        buffer.fill(Complex::new(0.0, 0.0));
        for (k, slot) in buffer.iter_mut().take(win_length).enumerate() {
            if let Some(i) = (t + k).checked_sub(half) {
                if i < envelope.len() {
                    *slot = Complex::new(envelope[i] * window[k], 0.0);
                }
            }
        }

        let mut acf = autocorrelate(&mut buffer, fft.as_ref(), ifft.as_ref(), win_length);

        let peak = acf.iter().copied().fold(0.0f32, f32::max);
        if peak > EPSILON {
            for v in acf.iter_mut() {
                *v /= peak;
            }
        } else {
            acf.fill(0.0);
        }
        tempogram.push(acf);
    }

    log::debug!(
        "Tempogram: {} frames x {} lags",
        tempogram.len(),
        win_length
    );

    Ok(tempogram)
}

/// Autocorrelate a zero-padded buffer in place and return the first `n_lags` lags
fn autocorrelate(
    buffer: &mut [Complex<f32>],
    fft: &dyn rustfft::Fft<f32>,
    ifft: &dyn rustfft::Fft<f32>,
    n_lags: usize,
) -> Vec<f32> {
    fft.process(buffer);
    for x in buffer.iter_mut() {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }
    ifft.process(buffer);

    let scale = 1.0 / buffer.len() as f32;
    buffer[..n_lags]
        .iter()
        .map(|x| (x.re * scale).max(0.0))
        .collect()
}
