//! Pitch-preserving time-stretch.
//!
//! A phase vocoder over a Hann-windowed STFT: magnitudes are interpolated
//! between analysis frames at the stretched positions while phases are
//! accumulated from each bin's measured instantaneous frequency, then the
//! result is resynthesised by weighted overlap-add.

use std::f32::consts::PI;

use realfft::RealFftPlanner;
use rustfft::num_complex::Complex;
use tracing::debug;

use crate::error::{AudioError, Result};

/// Phase-vocoder time stretcher
#[derive(Debug, Clone, Copy)]
pub struct TimeStretcher {
    fft_size: usize,
    hop_size: usize,
}

impl Default for TimeStretcher {
    fn default() -> Self {
        Self::new(2048, 512)
    }
}

impl TimeStretcher {
    pub fn new(fft_size: usize, hop_size: usize) -> Self {
        Self { fft_size, hop_size }
    }

    /// Stretch `samples` in time by `rate`.
    ///
    /// `rate > 1` shortens the signal, `rate < 1` lengthens it. The output has
    /// `round(len / rate)` samples.
    pub fn stretch(&self, samples: &[f32], rate: f64) -> Result<Vec<f32>> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(AudioError::InvalidParameters {
                details: format!("Speed factor must be a positive number, got {}", rate),
            }.into());
        }

        if self.fft_size < 4 || self.hop_size == 0 || self.hop_size > self.fft_size {
            return Err(AudioError::StretchFailed {
                reason: format!("Invalid STFT geometry {}/{}", self.fft_size, self.hop_size),
            }.into());
        }

        let target_len = (samples.len() as f64 / rate).round() as usize;
        if samples.is_empty() || target_len == 0 {
            return Ok(Vec::new());
        }

        let spectrogram = self.analyze(samples)?;
        let stretched = self.phase_vocoder(&spectrogram, rate);
        debug!(
            "Time-stretch x{:.3}: {} -> {} STFT frames",
            rate,
            spectrogram.len(),
            stretched.len()
        );
        self.synthesize(&stretched, target_len)
    }

    fn window(&self) -> Vec<f32> {
        // Periodic Hann
        (0..self.fft_size)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / self.fft_size as f32).cos())
            .collect()
    }

    /// Centered STFT with zero padding of half a window on each side
    fn analyze(&self, samples: &[f32]) -> Result<Vec<Vec<Complex<f32>>>> {
        let pad = self.fft_size / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let frame_count = 1 + (padded.len() - self.fft_size) / self.hop_size;
        let window = self.window();

        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(self.fft_size);
        let mut input = r2c.make_input_vec();

        let mut frames = Vec::with_capacity(frame_count);
        for frame_idx in 0..frame_count {
            let start = frame_idx * self.hop_size;
            for (i, slot) in input.iter_mut().enumerate() {
                *slot = padded[start + i] * window[i];
            }

            let mut spectrum = r2c.make_output_vec();
            r2c.process(&mut input, &mut spectrum)
                .map_err(|e| AudioError::StretchFailed { reason: e.to_string() })?;
            frames.push(spectrum);
        }

        Ok(frames)
    }

    fn phase_vocoder(&self, frames: &[Vec<Complex<f32>>], rate: f64) -> Vec<Vec<Complex<f32>>> {
        let bins = self.fft_size / 2 + 1;
        let zero_frame = vec![Complex::new(0.0f32, 0.0); bins];

        // Expected phase advance per hop for each bin
        let phase_advance: Vec<f32> = (0..bins)
            .map(|k| 2.0 * PI * k as f32 * self.hop_size as f32 / self.fft_size as f32)
            .collect();

        let mut phase_acc: Vec<f32> = frames[0].iter().map(|c| c.arg()).collect();
        let mut output = Vec::new();

        let mut step = 0.0f64;
        while step < frames.len() as f64 {
            let idx = step.floor() as usize;
            let alpha = (step - idx as f64) as f32;
            let current = &frames[idx];
            let next = frames.get(idx + 1).unwrap_or(&zero_frame);

            let mut out_frame = Vec::with_capacity(bins);
            for k in 0..bins {
                let magnitude = (1.0 - alpha) * current[k].norm() + alpha * next[k].norm();
                out_frame.push(Complex::from_polar(magnitude, phase_acc[k]));

                let mut delta = next[k].arg() - current[k].arg() - phase_advance[k];
                delta -= 2.0 * PI * (delta / (2.0 * PI)).round();
                phase_acc[k] += phase_advance[k] + delta;
            }
            output.push(out_frame);

            step += rate;
        }

        output
    }

    /// Weighted overlap-add resynthesis trimmed to `target_len`
    fn synthesize(&self, frames: &[Vec<Complex<f32>>], target_len: usize) -> Result<Vec<f32>> {
        let pad = self.fft_size / 2;
        let window = self.window();
        let total_len = self.fft_size + self.hop_size * frames.len().saturating_sub(1);

        let mut signal = vec![0.0f32; total_len.max(pad + target_len)];
        let mut weights = vec![0.0f32; signal.len()];

        let mut planner = RealFftPlanner::<f32>::new();
        let c2r = planner.plan_fft_inverse(self.fft_size);
        let mut time = c2r.make_output_vec();
        let scale = 1.0 / self.fft_size as f32;

        for (frame_idx, frame) in frames.iter().enumerate() {
            let mut spectrum = frame.clone();
            // DC and Nyquist bins of a real signal carry no imaginary part
            if let Some(first) = spectrum.first_mut() {
                first.im = 0.0;
            }
            if let Some(last) = spectrum.last_mut() {
                last.im = 0.0;
            }

            c2r.process(&mut spectrum, &mut time)
                .map_err(|e| AudioError::StretchFailed { reason: e.to_string() })?;

            let start = frame_idx * self.hop_size;
            for i in 0..self.fft_size {
                signal[start + i] += time[i] * scale * window[i];
                weights[start + i] += window[i] * window[i];
            }
        }

        let output = signal
            .iter()
            .zip(&weights)
            .skip(pad)
            .take(target_len)
            .map(|(&s, &w)| if w > 1e-6 { s / w } else { s })
            .collect::<Vec<f32>>();

        let mut output = output;
        output.resize(target_len, 0.0);
        Ok(output)
    }
}
