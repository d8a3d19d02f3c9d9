// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A rational polyphase resampler for fixed-length impulse responses.

use std::f64::consts::PI;

use log::trace;

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// The zeroth-order modified Bessel function of the first kind, via its
/// series expansion. The series is summed until it no longer changes the
/// accumulator.
fn bessel_i0(x: f64) -> f64 {
    let x2 = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;

    loop {
        let y = x2 / k;
        term *= y * y;

        let last_sum = sum;
        sum += term;
        if sum == last_sum {
            break;
        }

        k += 1.0;
    }

    sum
}

/// The Kaiser window evaluated at `k` in [-1, 1]. Values outside the window
/// are zero.
fn kaiser(beta: f64, k: f64) -> f64 {
    if !(-1.0..=1.0).contains(&k) {
        return 0.0;
    }
    bessel_i0(beta * (1.0 - k * k).sqrt()) / bessel_i0(beta)
}

/// Estimates the order of a Kaiser-windowed FIR filter for the given
/// stopband rejection (dB) and normalized transition width.
fn kaiser_order(rejection: f64, transition: f64) -> u32 {
    let w_t = 2.0 * PI * transition;
    if rejection > 21.0 {
        ((rejection - 7.95) / (2.285 * w_t)).ceil() as u32
    }
    else {
        (5.79 / w_t).ceil() as u32
    }
}

/// The Kaiser shape parameter for the given stopband rejection (dB).
fn kaiser_beta(rejection: f64) -> f64 {
    if rejection > 50.0 {
        0.1102 * (rejection - 8.7)
    }
    else if rejection >= 21.0 {
        0.5842 * (rejection - 21.0).powf(0.4) + 0.07886 * (rejection - 21.0)
    }
    else {
        0.0
    }
}

/// The normalized cardinal sine.
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-15 {
        return 1.0;
    }
    (PI * x).sin() / (PI * x)
}

/// One tap of a Kaiser-windowed low-pass prototype with the given gain,
/// cutoff, half-length `l`, and tap index `i` in `[0, 2l]`.
fn sinc_filter(l: u32, beta: f64, gain: f64, cutoff: f64, i: u32) -> f64 {
    let x = f64::from(i) - f64::from(l);
    kaiser(beta, x / f64::from(l)) * 2.0 * gain * cutoff * sinc(2.0 * cutoff * x)
}

/// `PolyphaseResampler` converts a bounded signal between two sample rates
/// through a windowed-sinc prototype evaluated polyphase, so only the taps
/// that land on input samples are computed.
///
/// Output sample 0 is aligned with input sample 0; the prototype's group
/// delay is compensated internally.
pub struct PolyphaseResampler {
    /// Upsampling factor.
    p: u32,
    /// Downsampling factor.
    q: u32,
    /// Filter length.
    m: u32,
    /// Filter latency in filter taps (half the length).
    l: u32,
    /// Prototype filter coefficients.
    f: Vec<f64>,
}

impl PolyphaseResampler {
    pub fn new(src_rate: u32, dst_rate: u32) -> Self {
        assert!(src_rate > 0 && dst_rate > 0);

        let g = gcd(src_rate, dst_rate);
        let p = dst_rate / g;
        let q = src_rate / g;

        // The cutoff is adjusted by half the transition width, so the
        // transition ends before the nyquist (0.5). Both are scaled by the
        // downsampling factor.
        let (cutoff, width) = if p > q {
            (0.475 / f64::from(p), 0.05 / f64::from(p))
        }
        else {
            (0.475 / f64::from(q), 0.05 / f64::from(q))
        };

        // A rejection of -180 dB is used for the stopband.
        let l = kaiser_order(180.0, width) / 2;
        let beta = kaiser_beta(180.0);
        let m = l * 2 + 1;

        let f = (0..m).map(|i| sinc_filter(l, beta, f64::from(p), cutoff, i)).collect();

        trace!("Resampling {}hz -> {}hz ({}/{}, {} taps)", src_rate, dst_rate, p, q, m);
        PolyphaseResampler { p, q, m, l, f }
    }

    /// Resamples `input` into `output`. The slice lengths select how much of
    /// the converted signal is produced; indices past either end of the
    /// input read as zero.
    pub fn process(&self, input: &[f64], output: &mut [f64]) {
        let p = self.p as usize;
        let q = self.q as usize;
        let m = self.m as usize;
        let l = self.l as usize;

        for (i, out) in output.iter_mut().enumerate() {
            // The input starts at l to compensate for the filter delay. This
            // drops any build-up from the first half of the filter.
            let mut j_f = (l + q * i) % p;
            let mut j_s = ((l + q * i) / p) as isize;

            let mut r = 0.0;
            while j_f < m {
                if j_s >= 0 && (j_s as usize) < input.len() {
                    r += self.f[j_f] * input[j_s as usize];
                }
                j_f += p;
                j_s -= 1;
            }
            *out = r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PolyphaseResampler;

    #[test]
    fn verify_prototype_symmetry() {
        let rs = PolyphaseResampler::new(22050, 44100);
        let l = rs.l as usize;
        for k in 0..=l {
            assert!((rs.f[l - k] - rs.f[l + k]).abs() < 1e-12);
        }
    }

    #[test]
    fn verify_same_rate_passband() {
        let rs = PolyphaseResampler::new(44100, 44100);

        let input = vec![1.0f64; 1024];
        let mut output = vec![0.0f64; 1024];
        rs.process(&input, &mut output);

        // DC sits well inside the passband, so samples whose filter window
        // lies fully inside the input reproduce it. Samples near the edges
        // see the zero padding.
        for &s in &output[256..768] {
            assert!((s - 1.0).abs() < 1e-6, "sample {} deviates from DC", s);
        }
    }

    #[test]
    fn verify_double_rate_dc_gain() {
        let rs = PolyphaseResampler::new(22050, 44100);

        let input = vec![1.0f64; 1024];
        let mut output = vec![0.0f64; 2048];
        rs.process(&input, &mut output);

        for &s in &output[512..1536] {
            assert!((s - 1.0).abs() < 1e-6, "sample {} deviates from DC", s);
        }
    }

    #[test]
    fn verify_downsample_dc_gain() {
        let rs = PolyphaseResampler::new(44100, 22050);

        let input = vec![1.0f64; 2048];
        let mut output = vec![0.0f64; 1024];
        rs.process(&input, &mut output);

        for &s in &output[256..768] {
            assert!((s - 1.0).abs() < 1e-6, "sample {} deviates from DC", s);
        }
    }
}
