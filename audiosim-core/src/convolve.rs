//! FFT-based linear convolution.
//!
//! Both inputs are zero-padded to `N = src.len() + ir.len() - 1`, transformed,
//! multiplied bin by bin and transformed back. rustfft leaves the inverse
//! transform unnormalized, so the result is scaled by `1/N`.

use rustfft::{FftPlanner, num_complex::Complex};

/// Linear convolution with a plan cache.
///
/// Streams convolve blocks of the same length against impulse responses of the
/// same length over and over, so the planner is kept between calls and hands
/// back the already planned transforms.
pub struct Convolver {
    planner: FftPlanner<f64>,
    scratch: Vec<Complex<f64>>,
}

impl Default for Convolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Convolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Convolver")
            .field("scratch_len", &self.scratch.len())
            .finish_non_exhaustive()
    }
}

impl Convolver {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            scratch: Vec::new(),
        }
    }

    /// Convolves `src` with `ir`. The result has `src.len() + ir.len() - 1`
    /// samples, or none if either input is empty.
    pub fn convolve(&mut self, src: &[Complex<f64>], ir: &[Complex<f64>]) -> Vec<Complex<f64>> {
        if src.is_empty() || ir.is_empty() {
            return Vec::new();
        }

        let n = src.len() + ir.len() - 1;
        let fft = self.planner.plan_fft_forward(n);
        let ifft = self.planner.plan_fft_inverse(n);

        let mut signal = zero_padded(src, n);
        let mut kernel = zero_padded(ir, n);

        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        if self.scratch.len() < scratch_len {
            self.scratch.resize(scratch_len, Complex::new(0.0, 0.0));
        }

        fft.process_with_scratch(&mut signal, &mut self.scratch[..fft.get_inplace_scratch_len()]);
        fft.process_with_scratch(&mut kernel, &mut self.scratch[..fft.get_inplace_scratch_len()]);

        for (sig, ker) in signal.iter_mut().zip(kernel.iter()) {
            *sig *= ker;
        }

        ifft.process_with_scratch(&mut signal, &mut self.scratch[..ifft.get_inplace_scratch_len()]);

        let scale = 1.0 / n as f64;
        for sample in &mut signal {
            *sample *= scale;
        }
        signal
    }

    /// Convolves two real signals, discarding the imaginary residue.
    pub fn convolve_real(&mut self, src: &[f64], ir: &[f64]) -> Vec<f64> {
        let src: Vec<Complex<f64>> = src.iter().map(|&x| Complex::new(x, 0.0)).collect();
        let ir: Vec<Complex<f64>> = ir.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.convolve(&src, &ir)
            .into_iter()
            .map(|sample| sample.re)
            .collect()
    }
}

/// One-shot convolution; see [`Convolver::convolve`].
pub fn convolve(src: &[Complex<f64>], ir: &[Complex<f64>]) -> Vec<Complex<f64>> {
    Convolver::new().convolve(src, ir)
}

fn zero_padded(samples: &[Complex<f64>], len: usize) -> Vec<Complex<f64>> {
    let mut padded = Vec::with_capacity(len);
    padded.extend_from_slice(samples);
    padded.resize(len, Complex::new(0.0, 0.0));
    padded
}
