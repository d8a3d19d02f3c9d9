// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The point-source query engine.

use std::f32::consts::{PI, TAU};

use crate::store::{HrirSamples, HrtfStore};
use crate::{HRIR_DELAY_FRACONE, PASSTHRU_COEFF};

/// A grid index paired with the fractional distance toward the next index.
#[derive(Clone, Copy)]
pub(crate) struct IdxBlend {
    pub idx: usize,
    pub blend: f32,
}

/// Calculates the index of the elevation ring at or below `ev` and the
/// blend toward the next ring. The grid spans `[-pi/2, pi/2]` across
/// `ev_count` rings.
pub(crate) fn calc_ev_index(ev_count: usize, ev: f32) -> IdxBlend {
    let x = (PI * 0.5 + ev) * (ev_count - 1) as f32 / PI;
    let idx = x as u32;
    IdxBlend { idx: (idx as usize).min(ev_count - 1), blend: x - idx as f32 }
}

/// Calculates the index of the azimuth at or below `az` and the blend
/// toward the next azimuth. The bias keeps `x` non-negative for the whole
/// `[-pi, pi]` input range before the modulo.
pub(crate) fn calc_az_index(az_count: usize, az: f32) -> IdxBlend {
    let x = (TAU + az) * az_count as f32 / TAU;
    let idx = x as u32;
    IdxBlend { idx: idx as usize % az_count, blend: x - idx as f32 }
}

impl HrtfStore {
    /// Synthesizes the filter taps and whole-sample delays for a point
    /// source.
    ///
    /// `spread` (radians, `[0, 2pi]`) widens the source toward
    /// omnidirectional: at zero the output is the exact bilinear blend of
    /// the four surrounding responses, at `2pi` only the pass-through tap
    /// remains.
    pub fn get_coeffs(
        &self,
        elevation: f32,
        azimuth: f32,
        distance: f32,
        spread: f32,
        coeffs: &mut HrirSamples,
        delays: &mut [u32; 2],
    ) {
        let dirfact = 1.0 - spread / TAU;

        // Claim the nearest field not exceeding the queried distance; the
        // fields are ordered farthest first, and the last (nearest) field
        // covers everything closer than itself.
        let mut ebase = 0usize;
        let mut field = 0usize;
        while field < self.fields.len() - 1 && distance < self.fields[field].distance {
            ebase += usize::from(self.fields[field].ev_count);
            field += 1;
        }
        let ev_count = usize::from(self.fields[field].ev_count);

        let elev0 = calc_ev_index(ev_count, elevation);
        let elev1_idx = (elev0.idx + 1).min(ev_count - 1);
        let elev0_row = self.elevs[ebase + elev0.idx];
        let elev1_row = self.elevs[ebase + elev1_idx];

        let az0 = calc_az_index(usize::from(elev0_row.az_count), azimuth);
        let az1 = calc_az_index(usize::from(elev1_row.az_count), azimuth);

        // The four corner responses to blend.
        let idx = [
            usize::from(elev0_row.ir_offset) + az0.idx,
            usize::from(elev0_row.ir_offset) + (az0.idx + 1) % usize::from(elev0_row.az_count),
            usize::from(elev1_row.ir_offset) + az1.idx,
            usize::from(elev1_row.ir_offset) + (az1.idx + 1) % usize::from(elev1_row.az_count),
        ];

        let blend = [
            (1.0 - elev0.blend) * (1.0 - az0.blend) * dirfact,
            (1.0 - elev0.blend) * az0.blend * dirfact,
            elev0.blend * (1.0 - az1.blend) * dirfact,
            elev0.blend * az1.blend * dirfact,
        ];

        // Blend the fixed-point delays over all four corners for each ear,
        // then floor to whole samples.
        for (ch, delay) in delays.iter_mut().enumerate() {
            let mut d = 0.0f32;
            for (&i, &b) in idx.iter().zip(blend.iter()) {
                d += f32::from(self.delays[i][ch]) * b;
            }
            *delay = (d / HRIR_DELAY_FRACONE as f32) as u32;
        }

        // The pass-through tap carries the omni share of the source.
        coeffs[0] = [PASSTHRU_COEFF * (1.0 - dirfact); 2];
        for sample in coeffs[1..].iter_mut() {
            *sample = [0.0; 2];
        }
        for (&i, &mult) in idx.iter().zip(blend.iter()) {
            let src = &self.coeffs[i];
            for j in 0..usize::from(self.ir_size) {
                coeffs[j][0] += src[j][0] * mult;
                coeffs[j][1] += src[j][1] * mult;
            }
        }
    }
}
