// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Baking a full ambisonic decode into per-channel HRTF responses.

use auralis_core::dsp::BandSplitter;

use log::trace;

use crate::query::{calc_az_index, calc_ev_index};
use crate::store::{AngularPoint, HrirSamples, HrtfStore};
use crate::{
    HRIR_DELAY_FRACHALF, HRIR_DELAY_FRACONE, HRIR_LENGTH, MAX_AMBI_CHANNELS, MAX_HRIR_DELAY,
    MOD_IR_SIZE,
};

/// Ambisonic order of each ACN channel, up to third order.
const AMBI_ORDER_FROM_CHANNEL: [usize; MAX_AMBI_CHANNELS] =
    [0, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3];

/// Crossover frequency of the dual-band decode, in Hz.
const XOVER_FREQ: f64 = 400.0;

/// Lead-in samples reserved in dual-band mode so the crossover's pre-ring
/// stays inside each response.
const BASE_DELAY_DUALBAND: u32 = 16;

/// A baked per-ambisonic-channel HRTF decode, filled by
/// [`build_bformat_hrtf`].
pub struct DirectHrtfState {
    /// Effective length of the baked responses, in samples.
    pub ir_size: u32,
    /// Per-channel stereo responses.
    pub coeffs: Box<[HrirSamples]>,
}

impl DirectHrtfState {
    /// Allocates a zeroed state for `num_chans` ambisonic channels.
    pub fn new(num_chans: usize) -> Self {
        DirectHrtfState {
            ir_size: 0,
            coeffs: vec![HrirSamples::default(); num_chans].into_boxed_slice(),
        }
    }
}

/// A blended response at one sample point, in double precision, with its
/// ear delays still fractional in fixed-point units.
struct ImpulseResponse {
    hrir: Box<[[f64; 2]]>,
    ldelay: f64,
    rdelay: f64,
}

/// Rounds a fractional fixed-point delay to whole samples. Rounding happens
/// here once, after the minimum delay has been subtracted; flooring the
/// blended delays any earlier would misalign points by up to a sample.
fn delay_round(delay: f64) -> u32 {
    ((delay + f64::from(HRIR_DELAY_FRACHALF)) / f64::from(HRIR_DELAY_FRACONE)) as u32
}

/// Bakes the decode of `points` ambisonic sample directions into `state`.
///
/// `matrix` holds each point's per-channel gains and `order_hf_gain` the
/// high-frequency gain per ambisonic order. In dual-band mode each response
/// is split around [`XOVER_FREQ`] with the splitter's phase shift
/// compensated, and the order gain applies to the high band alone; in
/// single-band mode it scales the whole response.
pub fn build_bformat_hrtf(
    store: &HrtfStore,
    state: &mut DirectHrtfState,
    points: &[AngularPoint],
    matrix: &[[f32; MAX_AMBI_CHANNELS]],
    order_hf_gain: &[f32; 4],
    dual_band: bool,
) {
    assert!(!points.is_empty());
    assert_eq!(points.len(), matrix.len());
    let num_chans = state.coeffs.len();
    assert!(num_chans <= MAX_AMBI_CHANNELS);

    // Blend the response at each sample point over the first field,
    // tracking the delay range for the later alignment.
    let ev_count = usize::from(store.fields()[0].ev_count);
    let mut min_delay = f64::from(u32::from(MAX_HRIR_DELAY) * HRIR_DELAY_FRACONE);
    let mut max_delay = 0.0f64;
    let mut responses = Vec::with_capacity(points.len());
    for pt in points {
        let elev0 = calc_ev_index(ev_count, pt.elevation);
        let elev1_idx = (elev0.idx + 1).min(ev_count - 1);
        let elev0_row = store.elevations()[elev0.idx];
        let elev1_row = store.elevations()[elev1_idx];

        let az0 = calc_az_index(usize::from(elev0_row.az_count), pt.azimuth);
        let az1 = calc_az_index(usize::from(elev1_row.az_count), pt.azimuth);

        let idx = [
            usize::from(elev0_row.ir_offset) + az0.idx,
            usize::from(elev0_row.ir_offset) + (az0.idx + 1) % usize::from(elev0_row.az_count),
            usize::from(elev1_row.ir_offset) + az1.idx,
            usize::from(elev1_row.ir_offset) + (az1.idx + 1) % usize::from(elev1_row.az_count),
        ];

        let blend = [
            f64::from((1.0 - elev0.blend) * (1.0 - az0.blend)),
            f64::from((1.0 - elev0.blend) * az0.blend),
            f64::from(elev0.blend * (1.0 - az1.blend)),
            f64::from(elev0.blend * az1.blend),
        ];

        let mut hrir = vec![[0.0f64; 2]; HRIR_LENGTH].into_boxed_slice();
        let mut ldelay = 0.0f64;
        let mut rdelay = 0.0f64;
        for (&i, &b) in idx.iter().zip(blend.iter()) {
            ldelay += f64::from(store.delays()[i][0]) * b;
            rdelay += f64::from(store.delays()[i][1]) * b;

            let src = &store.coeffs()[i];
            for j in 0..usize::from(store.ir_size()) {
                hrir[j][0] += f64::from(src[j][0]) * b;
                hrir[j][1] += f64::from(src[j][1]) * b;
            }
        }

        min_delay = min_delay.min(ldelay.min(rdelay));
        max_delay = max_delay.max(ldelay.max(rdelay));
        responses.push(ImpulseResponse { hrir, ldelay, rdelay });
    }

    let base_delay = if dual_band { BASE_DELAY_DUALBAND } else { 0 };
    let mut accum = vec![[[0.0f64; 2]; HRIR_LENGTH]; num_chans];

    if dual_band {
        let mut splitter = BandSplitter::new(XOVER_FREQ / f64::from(store.sample_rate()));

        // The response sits in the last quarter of the work buffer, leaving
        // room for the reversed all-pass pass and the delayed read-out.
        let mut flt_in = vec![0.0f64; HRIR_LENGTH * 4];
        let mut flt_hp = vec![0.0f64; HRIR_LENGTH * 4];
        let mut flt_lp = vec![0.0f64; HRIR_LENGTH * 4];

        for (res, gains) in responses.iter().zip(matrix) {
            let ldelay = delay_round(res.ldelay - min_delay) + base_delay;
            let rdelay = delay_round(res.rdelay - min_delay) + base_delay;

            for (ch, delay) in [(0usize, ldelay), (1usize, rdelay)] {
                for sample in flt_in.iter_mut() {
                    *sample = 0.0;
                }
                for (j, sample) in res.hrir.iter().enumerate() {
                    flt_in[HRIR_LENGTH * 3 + j] = sample[ch];
                }

                // Undo the phase the splitter is about to add: all-pass the
                // time-reversed response, then restore its direction.
                flt_in.reverse();
                splitter.apply_allpass(&mut flt_in);
                flt_in.reverse();

                splitter.clear();
                splitter.process(&mut flt_hp, &mut flt_lp, &flt_in);

                // Sample j of the band buffers lands at output index
                // j - delay.
                let offset = HRIR_LENGTH * 3 - delay as usize;
                for (i, chan) in accum.iter_mut().enumerate() {
                    let mult = f64::from(gains[i]);
                    let hfgain = f64::from(order_hf_gain[AMBI_ORDER_FROM_CHANNEL[i]]);
                    for k in 0..HRIR_LENGTH {
                        chan[k][ch] += (flt_hp[offset + k] * hfgain + flt_lp[offset + k]) * mult;
                    }
                }
            }
        }
    }
    else {
        for (res, gains) in responses.iter().zip(matrix) {
            let ldelay = delay_round(res.ldelay - min_delay) as usize;
            let rdelay = delay_round(res.rdelay - min_delay) as usize;
            let usable = HRIR_LENGTH - ldelay.max(rdelay);

            for (i, chan) in accum.iter_mut().enumerate() {
                let mult =
                    f64::from(order_hf_gain[AMBI_ORDER_FROM_CHANNEL[i]]) * f64::from(gains[i]);
                for j in 0..usable {
                    chan[ldelay + j][0] += res.hrir[j][0] * mult;
                    chan[rdelay + j][1] += res.hrir[j][1] * mult;
                }
            }
        }
    }

    for (chan, out) in accum.iter().zip(state.coeffs.iter_mut()) {
        for (k, sample) in out.iter_mut().enumerate() {
            sample[0] = chan[k][0] as f32;
            sample[1] = chan[k][1] as f32;
        }
    }

    max_delay -= min_delay;
    let ir_size = (u32::from(store.ir_size()) + 2 * base_delay).min(HRIR_LENGTH as u32);
    let mut max_length = (delay_round(max_delay) + ir_size).min(HRIR_LENGTH as u32);
    max_length += (u32::from(MOD_IR_SIZE) - max_length % u32::from(MOD_IR_SIZE))
        % u32::from(MOD_IR_SIZE);
    state.ir_size = max_length;

    trace!("Skipped min delay: {}, new FIR length: {}", min_delay, max_length);
}
