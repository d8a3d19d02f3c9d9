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

/// Loads a `MinPHR00` data set: a single distance-less field with explicit
/// elevation offsets and 16-bit left-ear coefficients.
pub(super) fn load<B: ReadBytes>(reader: &mut B) -> Result<HrtfStore> {
    let rate = reader.read_u32()?;
    let ir_count = reader.read_u16()?;
    let ir_size = reader.read_u16()?;
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

    let mut ev_offset = vec![0u16; usize::from(ev_count)];
    for off in ev_offset.iter_mut() {
        *off = reader.read_u16()?;
    }

    // The offsets must start the table and strictly increase, leaving a
    // non-empty azimuth ring for every elevation.
    if ev_offset[0] != 0 {
        error!("Invalid evOffset[0]: {} (must be 0)", ev_offset[0]);
        failed = true;
    }
    for i in 1..ev_offset.len() {
        if ev_offset[i] <= ev_offset[i - 1] {
            error!("Invalid evOffset[{}]: {} (last: {})", i, ev_offset[i], ev_offset[i - 1]);
            failed = true;
        }
    }
    let last = ev_offset[ev_offset.len() - 1];
    if ir_count <= last {
        error!("Invalid irCount: {} (last evOffset: {})", ir_count, last);
        failed = true;
    }
    if failed {
        return decode_error("mhr: elevation offsets are not increasing");
    }

    let mut elevs = Vec::with_capacity(ev_offset.len());
    for (i, &offset) in ev_offset.iter().enumerate() {
        let next = if i + 1 < ev_offset.len() { ev_offset[i + 1] } else { ir_count };
        let az_count = next - offset;
        if az_count < MIN_AZ_COUNT || az_count > MAX_AZ_COUNT {
            error!(
                "Unsupported azimuth count: azCount[{}]={} ({} to {})",
                i, az_count, MIN_AZ_COUNT, MAX_AZ_COUNT
            );
            failed = true;
        }
        elevs.push(Elevation { az_count, ir_offset: offset });
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

#[cfg(test)]
mod tests {
    use auralis_core::io::BufReader;

    use crate::formats::testdata::v0_image;
    use crate::formats::load_hrtf_store;
    use crate::{HRIR_DELAY_FRACONE, MAX_HRIR_DELAY};

    // Five elevation rings of eight azimuths each.
    const EV_OFFSETS: [u16; 5] = [0, 8, 16, 24, 32];
    const IR_COUNT: u16 = 40;

    #[test]
    fn verify_left_right_mirroring() {
        // Give each left-ear response a distinct first tap.
        let image = v0_image(44100, IR_COUNT, 8, &EV_OFFSETS, |i, k| {
            if k == 0 {
                (i as i16) * 256
            }
            else {
                0
            }
        }, |i| (i % 4) as u8);

        let store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        // Azimuth 3 mirrors azimuth 5 on an eight-azimuth ring.
        for ring in 0..EV_OFFSETS.len() {
            let offset = usize::from(EV_OFFSETS[ring]);
            for j in 0..8usize {
                let mirrored = offset + (8 - j) % 8;
                assert_eq!(store.coeffs()[mirrored][0][1], store.coeffs()[offset + j][0][0]);
                assert_eq!(store.delays()[mirrored][1], store.delays()[offset + j][0]);
            }
        }
        assert_eq!(store.coeffs()[3][0][1], store.coeffs()[5][0][0]);
    }

    #[test]
    fn verify_delays_are_fixed_point_and_bounded() {
        let image = v0_image(48000, IR_COUNT, 8, &EV_OFFSETS, |_, _| 0, |i| (i % 16) as u8);
        let store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        let bound = u32::from(MAX_HRIR_DELAY) * HRIR_DELAY_FRACONE;
        for (i, delay) in store.delays().iter().enumerate() {
            assert_eq!(u32::from(delay[0]), (i as u32 % 16) * HRIR_DELAY_FRACONE);
            assert!(u32::from(delay[0]) <= bound);
            assert!(u32::from(delay[1]) <= bound);
        }
    }

    #[test]
    fn verify_rejects_bad_ir_size() {
        let image = v0_image(44100, IR_COUNT, 7, &EV_OFFSETS, |_, _| 0, |_| 0);
        assert!(load_hrtf_store(&mut BufReader::new(&image)).is_err());
    }

    #[test]
    fn verify_rejects_non_increasing_offsets() {
        let image = v0_image(44100, IR_COUNT, 8, &[0, 8, 8, 24, 32], |_, _| 0, |_| 0);
        assert!(load_hrtf_store(&mut BufReader::new(&image)).is_err());
    }

    #[test]
    fn verify_rejects_excessive_delay() {
        let image =
            v0_image(44100, IR_COUNT, 8, &EV_OFFSETS, |_, _| 0, |_| MAX_HRIR_DELAY + 1);
        assert!(load_hrtf_store(&mut BufReader::new(&image)).is_err());
    }
}
