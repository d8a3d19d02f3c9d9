// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conditioning of freshly loaded stores for the device sample rate.
//!
//! Everything here runs while the loader still solely owns the store,
//! before it is published to the cache.

use auralis_core::dsp::PolyphaseResampler;

use crate::store::HrtfStore;
use crate::{HRIR_DELAY_FRACONE, HRIR_LENGTH, MAX_HRIR_DELAY, MIN_IR_SIZE, MOD_IR_SIZE};

/// Resamples every impulse response to `devrate`, rescales the fixed-point
/// delays, and adjusts the effective IR length.
pub(crate) fn resample_store(store: &mut HrtfStore, devrate: u32) {
    debug_assert_ne!(store.sample_rate, devrate);

    let rs = PolyphaseResampler::new(store.sample_rate, devrate);
    let mut in_buf = [0.0f64; HRIR_LENGTH];
    let mut out_buf = [0.0f64; HRIR_LENGTH];
    for hrir in store.coeffs.iter_mut() {
        for ch in 0..2 {
            for (k, sample) in in_buf.iter_mut().enumerate() {
                *sample = f64::from(hrir[k][ch]);
            }
            rs.process(&in_buf, &mut out_buf);
            for (k, sample) in out_buf.iter().enumerate() {
                hrir[k][ch] = *sample as f32;
            }
        }
    }

    let srate = u64::from(store.sample_rate);
    let drate = u64::from(devrate);

    // Scale the delays for the new sample rate, rounding to nearest in
    // fixed-point and saturating at the delay-line limit.
    let limit = u64::from(MAX_HRIR_DELAY) * u64::from(HRIR_DELAY_FRACONE);
    for delay in store.delays.iter_mut() {
        for ch in 0..2 {
            let scaled = (u64::from(delay[ch]) * drate + srate / 2) / srate;
            delay[ch] = scaled.min(limit) as u8;
        }
    }

    // The effective IR length scales with the rate, rounded up to the
    // coefficient step.
    let scaled = (u64::from(store.ir_size) * drate + srate - 1) / srate;
    let mut ir_size = scaled.min(HRIR_LENGTH as u64) as u16;
    ir_size += (MOD_IR_SIZE - ir_size % MOD_IR_SIZE) % MOD_IR_SIZE;
    store.ir_size = ir_size;

    store.sample_rate = devrate;
    store.zero_coeff_tails();
}

/// Applies the `hrtf-size` override: an effective IR length strictly inside
/// the loaded one trims the filter, floored at the minimum and the length
/// step.
pub(crate) fn clamp_ir_size(store: &mut HrtfStore, size: u16) {
    if size > 0 && size < store.ir_size {
        store.ir_size = size.max(MIN_IR_SIZE);
        store.ir_size -= store.ir_size % MOD_IR_SIZE;
        store.zero_coeff_tails();
    }
}

#[cfg(test)]
mod tests {
    use auralis_core::io::BufReader;

    use crate::formats::testdata::v1_image;
    use crate::formats::load_hrtf_store;
    use crate::{HRIR_DELAY_FRACONE, MIN_IR_SIZE};

    use super::{clamp_ir_size, resample_store};

    const AZ_COUNTS: [u8; 5] = [1, 4, 4, 4, 1];

    #[test]
    fn verify_rate_doubling() {
        let image = v1_image(22050, 8, &AZ_COUNTS, |_, _| 0, |i| (i % 8) as u8);
        let mut store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        let old_delays: Vec<[u8; 2]> = store.delays().to_vec();
        resample_store(&mut store, 44100);

        assert_eq!(store.sample_rate(), 44100);
        assert_eq!(store.ir_size(), 16);
        for (new, old) in store.delays().iter().zip(old_delays) {
            assert_eq!(u32::from(new[0]), u32::from(old[0]) * 2);
            assert_eq!(u32::from(new[1]), u32::from(old[1]) * 2);
        }
    }

    #[test]
    fn verify_delay_saturation() {
        // Delay 32 at a 4x rate increase would be 128 samples, past the
        // delay line; it must saturate instead.
        let image = v1_image(11025, 8, &AZ_COUNTS, |_, _| 0, |_| 32);
        let mut store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        resample_store(&mut store, 44100);
        for delay in store.delays() {
            assert_eq!(u32::from(delay[0]), 63 * HRIR_DELAY_FRACONE);
        }
    }

    #[test]
    fn verify_size_override() {
        let image = v1_image(44100, 32, &AZ_COUNTS, |_, _| 0, |_| 0);
        let mut store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        // An odd override rounds down to the length step.
        clamp_ir_size(&mut store, 11);
        assert_eq!(store.ir_size(), 10);

        // Overrides below the minimum clamp up to it.
        clamp_ir_size(&mut store, 2);
        assert_eq!(store.ir_size(), MIN_IR_SIZE);

        // Larger-than-loaded overrides leave the store alone.
        clamp_ir_size(&mut store, 100);
        assert_eq!(store.ir_size(), MIN_IR_SIZE);
    }

    #[test]
    fn verify_tail_zeroing_after_trim() {
        let image = v1_image(44100, 32, &AZ_COUNTS, |_, k| if k < 32 { 1000 } else { 0 }, |_| 0);
        let mut store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        clamp_ir_size(&mut store, 16);
        for hrir in store.coeffs() {
            for sample in &hrir[16..] {
                assert_eq!(*sample, [0.0; 2]);
            }
            assert_ne!(hrir[15][0], 0.0);
        }
    }
}
