// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use auralis_core::errors::{decode_error, limit_error, Result};
use auralis_core::io::ReadBytes;

use log::error;

use crate::store::{Elevation, Field, HrirSamples, HrtfStore};
use crate::{
    HRIR_DELAY_FRACBITS, MAX_AZ_COUNT, MAX_EV_COUNT, MAX_FD_COUNT, MAX_FD_DISTANCE, MAX_HRIR_DELAY,
    MAX_IR_SIZE, MIN_AZ_COUNT, MIN_EV_COUNT, MIN_FD_COUNT, MIN_FD_DISTANCE, MIN_IR_SIZE,
    MOD_IR_SIZE,
};

const SAMPLE_TYPE_S16: u8 = 0;
const SAMPLE_TYPE_S24: u8 = 1;

const CHANNEL_TYPE_LEFT_ONLY: u8 = 0;
const CHANNEL_TYPE_LEFT_RIGHT: u8 = 1;

#[inline]
fn read_sample<B: ReadBytes>(reader: &mut B, sample_type: u8) -> Result<f32> {
    if sample_type == SAMPLE_TYPE_S16 {
        Ok(f32::from(reader.read_i16()?) / 32768.0)
    }
    else {
        Ok(reader.read_i24()? as f32 / 8388608.0)
    }
}

/// Loads a `MinPHR02` data set: multiple field depths, 16- or 24-bit
/// samples, and either left-only or true stereo responses.
pub(super) fn load<B: ReadBytes>(reader: &mut B) -> Result<HrtfStore> {
    let rate = reader.read_u32()?;
    let sample_type = reader.read_u8()?;
    let channel_type = reader.read_u8()?;
    let ir_size = u16::from(reader.read_u8()?);
    let fd_count = reader.read_u8()?;

    let mut failed = false;
    if rate == 0 {
        error!("Invalid sample rate: 0hz");
        failed = true;
    }
    if sample_type > SAMPLE_TYPE_S24 {
        error!("Unsupported sample type: {}", sample_type);
        failed = true;
    }
    if channel_type > CHANNEL_TYPE_LEFT_RIGHT {
        error!("Unsupported channel type: {}", channel_type);
        failed = true;
    }
    if ir_size < MIN_IR_SIZE || ir_size > MAX_IR_SIZE || ir_size % MOD_IR_SIZE != 0 {
        error!(
            "Unsupported HRIR size, irSize={} ({} to {} by {})",
            ir_size, MIN_IR_SIZE, MAX_IR_SIZE, MOD_IR_SIZE
        );
        failed = true;
    }
    if fd_count < MIN_FD_COUNT || fd_count > MAX_FD_COUNT {
        error!(
            "Unsupported FD count: fdCount={} ({} to {})",
            fd_count, MIN_FD_COUNT, MAX_FD_COUNT
        );
        failed = true;
    }
    if failed {
        return decode_error("mhr: invalid header field");
    }

    // Per-field headers. The file orders fields by strictly ascending
    // distance.
    let mut fields = Vec::with_capacity(usize::from(fd_count));
    let mut elevs: Vec<Elevation> = Vec::new();
    let mut last_distance = 0u16;
    for f in 0..usize::from(fd_count) {
        let distance = reader.read_u16()?;
        let ev_count = reader.read_u8()?;

        if distance < MIN_FD_DISTANCE || distance > MAX_FD_DISTANCE {
            error!(
                "Unsupported field distance[{}]={} ({} to {} millimetres)",
                f, distance, MIN_FD_DISTANCE, MAX_FD_DISTANCE
            );
            failed = true;
        }
        if f > 0 && distance <= last_distance {
            error!(
                "Field distance[{}] is not after the previous ({} <= {})",
                f, distance, last_distance
            );
            failed = true;
        }
        if ev_count < MIN_EV_COUNT || ev_count > MAX_EV_COUNT {
            error!(
                "Unsupported elevation count: evCount[{}]={} ({} to {})",
                f, ev_count, MIN_EV_COUNT, MAX_EV_COUNT
            );
            failed = true;
        }
        if failed {
            return decode_error("mhr: invalid field header");
        }

        for e in 0..usize::from(ev_count) {
            let az_count = u16::from(reader.read_u8()?);
            if az_count < MIN_AZ_COUNT || az_count > MAX_AZ_COUNT {
                error!(
                    "Unsupported azimuth count: azCount[{}][{}]={} ({} to {})",
                    f, e, az_count, MIN_AZ_COUNT, MAX_AZ_COUNT
                );
                failed = true;
            }
            elevs.push(Elevation { az_count, ir_offset: 0 });
        }
        if failed {
            return decode_error("mhr: azimuth count out of range");
        }

        fields.push(Field { distance: f32::from(distance) / 1000.0, ev_count });
        last_distance = distance;
    }

    // Establish the IR offsets. Enough fields and azimuths could overflow
    // the 16-bit offsets, so bound the total first.
    let ir_total: usize = elevs.iter().map(|e| usize::from(e.az_count)).sum();
    if ir_total > usize::from(u16::MAX) {
        error!("Too many impulse responses: {}", ir_total);
        return limit_error("mhr: impulse response count exceeds the offset range");
    }
    let mut offset = 0u16;
    for ev in elevs.iter_mut() {
        ev.ir_offset = offset;
        offset += ev.az_count;
    }

    let stereo = channel_type == CHANNEL_TYPE_LEFT_RIGHT;

    let mut coeffs = vec![HrirSamples::default(); ir_total];
    for hrir in coeffs.iter_mut() {
        for sample in hrir[..usize::from(ir_size)].iter_mut() {
            sample[0] = read_sample(reader, sample_type)?;
            if stereo {
                sample[1] = read_sample(reader, sample_type)?;
            }
        }
    }

    let mut delays = vec![[0u8; 2]; ir_total];
    for (i, delay) in delays.iter_mut().enumerate() {
        delay[0] = reader.read_u8()?;
        if delay[0] > MAX_HRIR_DELAY {
            error!("Invalid delays[{}][0]: {} (max: {})", i, delay[0], MAX_HRIR_DELAY);
            failed = true;
        }
        if stereo {
            delay[1] = reader.read_u8()?;
            if delay[1] > MAX_HRIR_DELAY {
                error!("Invalid delays[{}][1]: {} (max: {})", i, delay[1], MAX_HRIR_DELAY);
                failed = true;
            }
        }
    }
    if failed {
        return decode_error("mhr: delay exceeds the delay line");
    }
    for delay in delays.iter_mut() {
        delay[0] <<= HRIR_DELAY_FRACBITS;
        delay[1] <<= HRIR_DELAY_FRACBITS;
    }

    if channel_type == CHANNEL_TYPE_LEFT_ONLY {
        super::mirror_left_hrirs(&elevs, &mut coeffs, &mut delays);
    }

    // The file orders fields nearest first, but the store wants them
    // farthest first so the query walk lands on the nearest field not
    // exceeding the source distance. Reverse the per-field groups, keeping
    // each group's internal order.
    if fields.len() > 1 {
        let mut ranges = Vec::with_capacity(fields.len());
        let mut ev_base = 0usize;
        let mut ir_base = 0usize;
        for field in &fields {
            let ev_len = usize::from(field.ev_count);
            let ir_len: usize =
                elevs[ev_base..ev_base + ev_len].iter().map(|e| usize::from(e.az_count)).sum();
            ranges.push((ev_base..ev_base + ev_len, ir_base..ir_base + ir_len));
            ev_base += ev_len;
            ir_base += ir_len;
        }

        let mut new_fields = Vec::with_capacity(fields.len());
        let mut new_elevs = Vec::with_capacity(elevs.len());
        let mut new_coeffs = Vec::with_capacity(coeffs.len());
        let mut new_delays = Vec::with_capacity(delays.len());
        for (field, (ev_range, ir_range)) in fields.iter().zip(ranges).rev() {
            new_fields.push(*field);
            new_elevs.extend_from_slice(&elevs[ev_range]);
            new_coeffs.extend_from_slice(&coeffs[ir_range.clone()]);
            new_delays.extend_from_slice(&delays[ir_range]);
        }

        // Re-establish the IR offsets for the new elevation order.
        let mut offset = 0u16;
        for ev in new_elevs.iter_mut() {
            ev.ir_offset = offset;
            offset += ev.az_count;
        }

        fields = new_fields;
        elevs = new_elevs;
        coeffs = new_coeffs;
        delays = new_delays;
    }

    Ok(HrtfStore::new(rate, ir_size, fields, elevs, coeffs, delays))
}

#[cfg(test)]
mod tests {
    use auralis_core::io::BufReader;

    use crate::formats::testdata::Image;
    use crate::formats::load_hrtf_store;
    use crate::HRIR_DELAY_FRACONE;

    const S16: u8 = 0;
    const S24: u8 = 1;
    const LEFT_ONLY: u8 = 0;
    const LEFT_RIGHT: u8 = 1;

    /// Builds a two-field stereo image: a near field at 300 mm and a far
    /// field at 1400 mm, five single-azimuth rings each. Tap 0 of each IR
    /// encodes its file-order index, as does its left delay.
    fn two_field_image(sample_type: u8) -> Vec<u8> {
        let mut im = Image::new(b"MinPHR02");
        im.u32(48000);
        im.u8(sample_type);
        im.u8(LEFT_RIGHT);
        im.u8(8);
        im.u8(2);

        im.u16(300);
        im.u8(5);
        for _ in 0..5 {
            im.u8(1);
        }
        im.u16(1400);
        im.u8(5);
        for _ in 0..5 {
            im.u8(1);
        }

        for i in 0..10i32 {
            for k in 0..8 {
                let value = if k == 0 { i + 1 } else { 0 };
                match sample_type {
                    S16 => {
                        im.i16((value * 256) as i16);
                        im.i16(-(value * 256) as i16);
                    }
                    _ => {
                        im.i24(value * 65536);
                        im.i24(-value * 65536);
                    }
                }
            }
        }
        for i in 0..10u8 {
            im.u8(i);
            im.u8(i + 10);
        }
        im.0
    }

    #[test]
    fn verify_field_reversal() {
        let image = two_field_image(S16);
        let store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        // Farthest first in the store, nearest first in the file.
        assert_eq!(store.fields().len(), 2);
        assert!((store.fields()[0].distance - 1.4).abs() < 1e-6);
        assert!((store.fields()[1].distance - 0.3).abs() < 1e-6);

        // The far field's IRs (file order 5..10) now lead the tables, with
        // their internal order preserved.
        for i in 0..5usize {
            assert_eq!(store.coeffs()[i][0][0], (i as f32 + 6.0) * 256.0 / 32768.0);
            assert_eq!(store.coeffs()[i + 5][0][0], (i as f32 + 1.0) * 256.0 / 32768.0);
            assert_eq!(u32::from(store.delays()[i][0]), (i as u32 + 5) * HRIR_DELAY_FRACONE);
        }

        let offsets: Vec<u16> = store.elevations().iter().map(|e| e.ir_offset).collect();
        assert_eq!(offsets, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn verify_stereo_channels_and_delays() {
        let image = two_field_image(S16);
        let store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        // Right-channel taps are the negated left taps, right delays are
        // left + 10, both in file order 5..10 for the leading far field.
        for i in 0..5usize {
            assert_eq!(store.coeffs()[i][0][1], -store.coeffs()[i][0][0]);
            assert_eq!(
                u32::from(store.delays()[i][1]),
                (i as u32 + 15) * HRIR_DELAY_FRACONE
            );
        }
    }

    #[test]
    fn verify_s24_samples() {
        let image = two_field_image(S24);
        let store = load_hrtf_store(&mut BufReader::new(&image)).unwrap();

        // File-order IR 5 leads the store; its first tap is 6 * 65536 in
        // 24-bit fullscale.
        assert_eq!(store.coeffs()[0][0][0], 6.0 * 65536.0 / 8388608.0);
        assert_eq!(store.coeffs()[0][0][1], -6.0 * 65536.0 / 8388608.0);
    }

    #[test]
    fn verify_left_only_mirroring() {
        let mut im = Image::new(b"MinPHR02");
        im.u32(44100);
        im.u8(S16);
        im.u8(LEFT_ONLY);
        im.u8(8);
        im.u8(1);

        im.u16(500);
        im.u8(5);
        im.u8(1);
        im.u8(4);
        im.u8(4);
        im.u8(4);
        im.u8(1);

        for i in 0..14i32 {
            for k in 0..8 {
                im.i16(if k == 0 { (i * 100) as i16 } else { 0 });
            }
        }
        for i in 0..14u8 {
            im.u8(i % 8);
        }

        let store = load_hrtf_store(&mut BufReader::new(&im.0)).unwrap();

        // The four-azimuth ring at offset 1: azimuth 1 mirrors azimuth 3.
        assert_eq!(store.coeffs()[1 + 3][0][1], store.coeffs()[1 + 1][0][0]);
        assert_eq!(store.delays()[1 + 3][1], store.delays()[1 + 1][0]);
    }

    #[test]
    fn verify_rejects_non_ascending_distances() {
        let mut im = Image::new(b"MinPHR02");
        im.u32(48000);
        im.u8(S16);
        im.u8(LEFT_RIGHT);
        im.u8(8);
        im.u8(2);

        im.u16(1400);
        im.u8(5);
        for _ in 0..5 {
            im.u8(1);
        }
        im.u16(300);
        im.u8(5);
        for _ in 0..5 {
            im.u8(1);
        }

        assert!(load_hrtf_store(&mut BufReader::new(&im.0)).is_err());
    }

    #[test]
    fn verify_rejects_bad_sample_type() {
        let mut im = Image::new(b"MinPHR02");
        im.u32(48000);
        im.u8(2);
        im.u8(LEFT_RIGHT);
        im.u8(8);
        im.u8(1);
        assert!(load_hrtf_store(&mut BufReader::new(&im.0)).is_err());
    }
}
