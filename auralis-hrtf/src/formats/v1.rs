// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use auralis_core::errors::{decode_error, Result};
use auralis_core::io::ReadBytes;

use log::error;

use crate::store::{Elevation, Field, HrtfStore};
use crate::{
    MAX_AZ_COUNT, MAX_EV_COUNT, MAX_IR_SIZE, MIN_AZ_COUNT, MIN_EV_COUNT, MIN_IR_SIZE, MOD_IR_SIZE,
};

/// Loads a `MinPHR01` data set: a single distance-less field with explicit
/// per-elevation azimuth counts and 16-bit left-ear coefficients.
pub(super) fn load<B: ReadBytes>(reader: &mut B) -> Result<HrtfStore> {
    let rate = reader.read_u32()?;
    let ir_size = u16::from(reader.read_u8()?);
    let ev_count = reader.read_u8()?;

    let mut failed = false;
    if rate == 0 {
        error!("Invalid sample rate: 0hz");
        failed = true;
    }
    if ir_size < MIN_IR_SIZE || ir_size > MAX_IR_SIZE || ir_size % MOD_IR_SIZE != 0 {
        error!(
            "Unsupported HRIR size, irSize={} ({} to {} by {})",
            ir_size, MIN_IR_SIZE, MAX_IR_SIZE, MOD_IR_SIZE
        );
        failed = true;
    }
    if ev_count < MIN_EV_COUNT || ev_count > MAX_EV_COUNT {
        error!(
            "Unsupported elevation count: evCount={} ({} to {})",
            ev_count, MIN_EV_COUNT, MAX_EV_COUNT
        );
        failed = true;
    }
    if failed {
        return decode_error("mhr: invalid header field");
    }

    // The elevation offsets are implicit: prefix sums of the azimuth counts.
    let mut elevs = Vec::with_capacity(usize::from(ev_count));
    let mut ir_count = 0u16;
    for i in 0..usize::from(ev_count) {
        let az_count = u16::from(reader.read_u8()?);
        if az_count < MIN_AZ_COUNT || az_count > MAX_AZ_COUNT {
            error!(
                "Unsupported azimuth count: azCount[{}]={} ({} to {})",
                i, az_count, MIN_AZ_COUNT, MAX_AZ_COUNT
            );
            failed = true;
        }
        elevs.push(Elevation { az_count, ir_offset: ir_count });
        ir_count += az_count;
    }
    if failed {
        return decode_error("mhr: azimuth count out of range");
    }

    let mut coeffs = super::read_mono_coeffs_s16(reader, usize::from(ir_count), usize::from(ir_size))?;
    let mut delays = super::read_mono_delays(reader, usize::from(ir_count))?;

    super::mirror_left_hrirs(&elevs, &mut coeffs, &mut delays);

    let fields = vec![Field { distance: 0.0, ev_count }];
    Ok(HrtfStore::new(rate, ir_size, fields, elevs, coeffs, delays))
}
