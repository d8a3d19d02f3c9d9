// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A two-band crossover whose bands sum back to an all-pass response.

use std::f64::consts::TAU;

/// `BandSplitter` decomposes a signal into low and high bands around a
/// normalized crossover frequency. The low band is a two-stage one-pole
/// low-pass; the high band is the residue against a first-order all-pass
/// run in parallel, so `lo + hi` reconstructs the all-passed input.
///
/// [`BandSplitter::apply_allpass`] exposes the all-pass section alone, with
/// its own transient state. Running it over a time-reversed signal and
/// reversing the result gives the conjugate phase of the direct all-pass,
/// which a later [`BandSplitter::process`] call cancels exactly.
pub struct BandSplitter {
    coeff: f64,
    lp_z1: f64,
    lp_z2: f64,
    ap_z1: f64,
}

impl BandSplitter {
    /// Creates a splitter with the crossover at `f0norm` (cycles per sample,
    /// in `(0, 0.5)`).
    pub fn new(f0norm: f64) -> Self {
        let w = f0norm * TAU;
        let cw = w.cos();

        let coeff = if cw > f64::EPSILON { (w.sin() - 1.0) / cw } else { cw * -0.5 };

        BandSplitter { coeff, lp_z1: 0.0, lp_z2: 0.0, ap_z1: 0.0 }
    }

    /// Resets the filter state.
    pub fn clear(&mut self) {
        self.lp_z1 = 0.0;
        self.lp_z2 = 0.0;
        self.ap_z1 = 0.0;
    }

    /// Splits `input` into `hp_out` and `lp_out`. All three slices must have
    /// the same length.
    pub fn process(&mut self, hp_out: &mut [f64], lp_out: &mut [f64], input: &[f64]) {
        assert!(hp_out.len() == input.len() && lp_out.len() == input.len());

        let ap_coeff = self.coeff;
        let lp_coeff = self.coeff * 0.5 + 0.5;
        let mut lp_z1 = self.lp_z1;
        let mut lp_z2 = self.lp_z2;
        let mut ap_z1 = self.ap_z1;

        for ((hp, lp), &x) in hp_out.iter_mut().zip(lp_out.iter_mut()).zip(input.iter()) {
            // Low-pass sample processing.
            let mut d = (x - lp_z1) * lp_coeff;
            let mut lp_y = lp_z1 + d;
            lp_z1 = lp_y + d;

            d = (lp_y - lp_z2) * lp_coeff;
            lp_y = lp_z2 + d;
            lp_z2 = lp_y + d;

            *lp = lp_y;

            // All-pass sample processing.
            let ap_y = x * ap_coeff + ap_z1;
            ap_z1 = x - ap_y * ap_coeff;

            // The high band is the all-passed signal with the low band
            // removed.
            *hp = ap_y - lp_y;
        }

        self.lp_z1 = lp_z1;
        self.lp_z2 = lp_z2;
        self.ap_z1 = ap_z1;
    }

    /// Runs the all-pass section alone over `samples`, in place, with a
    /// zeroed transient state. The splitter's own state is untouched.
    pub fn apply_allpass(&self, samples: &mut [f64]) {
        let coeff = self.coeff;
        let mut z1 = 0.0;

        for s in samples.iter_mut() {
            let out = *s * coeff + z1;
            z1 = *s - out * coeff;
            *s = out;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BandSplitter;

    #[test]
    fn verify_bands_sum_to_allpass() {
        let mut splitter = BandSplitter::new(400.0 / 44100.0);

        // An impulse followed by silence exercises both transients.
        let mut input = [0.0f64; 256];
        input[0] = 1.0;

        let mut reference = input;
        splitter.apply_allpass(&mut reference);

        let mut hp = [0.0f64; 256];
        let mut lp = [0.0f64; 256];
        splitter.clear();
        splitter.process(&mut hp, &mut lp, &input);

        for i in 0..input.len() {
            assert!((hp[i] + lp[i] - reference[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn verify_dc_split() {
        let mut splitter = BandSplitter::new(400.0 / 44100.0);

        let input = [1.0f64; 1024];
        let mut hp = [0.0f64; 1024];
        let mut lp = [0.0f64; 1024];
        splitter.process(&mut hp, &mut lp, &input);

        // DC belongs entirely to the low band once the filters settle.
        assert!((lp[1023] - 1.0).abs() < 1e-6);
        assert!(hp[1023].abs() < 1e-6);
    }

    #[test]
    fn verify_clear_resets_state() {
        let mut splitter = BandSplitter::new(400.0 / 44100.0);

        let input = [1.0f64; 64];
        let mut hp = [0.0f64; 64];
        let mut lp = [0.0f64; 64];
        splitter.process(&mut hp, &mut lp, &input);

        let first = (hp[0], lp[0]);

        splitter.clear();
        splitter.process(&mut hp, &mut lp, &input);
        assert_eq!((hp[0], lp[0]), first);
    }
}
