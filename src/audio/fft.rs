//! Fixed-size radix-2 FFT used by the feature extractor.
//!
//! The plan is built once (bit-reversal table and twiddle factors) and then
//! reused for every analysis window. Input must be windowed by the caller.

use std::f32::consts::PI;

use crate::error::{AudioError, Result};

/// In-place iterative Cooley-Tukey transform over split real/imaginary buffers
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    bit_reversed: Vec<usize>,
    /// `exp(-2πik/N)` for `k in 0..N/2`, stored as (cos, sin) pairs
    twiddles: Vec<(f32, f32)>,
}

impl Fft {
    /// Plan a transform of `size` points. `size` must be a power of two >= 2.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(AudioError::InvalidParameters {
                details: format!("FFT size must be a power of two >= 2, got {}", size),
            }
            .into());
        }

        let bits = size.trailing_zeros();
        let bit_reversed = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();

        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f32 / size as f32;
                (angle.cos(), angle.sin())
            })
            .collect();

        Ok(Self {
            size,
            bit_reversed,
            twiddles,
        })
    }

    /// Number of points this plan transforms
    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform `re`/`im` in place. Both slices must be exactly `size()` long.
    pub fn process(&self, re: &mut [f32], im: &mut [f32]) -> Result<()> {
        if re.len() != self.size || im.len() != self.size {
            return Err(AudioError::InvalidParameters {
                details: format!(
                    "FFT buffers of length {}/{} do not match plan size {}",
                    re.len(),
                    im.len(),
                    self.size
                ),
            }
            .into());
        }

        for (i, &j) in self.bit_reversed.iter().enumerate() {
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= self.size {
            let half = len / 2;
            let stride = self.size / len;

            for start in (0..self.size).step_by(len) {
                for k in 0..half {
                    let (w_re, w_im) = self.twiddles[k * stride];
                    let a = start + k;
                    let b = a + half;

                    let t_re = re[b] * w_re - im[b] * w_im;
                    let t_im = re[b] * w_im + im[b] * w_re;

                    re[b] = re[a] - t_re;
                    im[b] = im[a] - t_im;
                    re[a] += t_re;
                    im[a] += t_im;
                }
            }

            len <<= 1;
        }

        Ok(())
    }
}

/// Symmetric Hann window of `size` points
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}
