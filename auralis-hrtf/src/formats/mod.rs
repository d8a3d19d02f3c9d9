// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsers for the versioned `MinPHR` binary HRTF formats.
//!
//! Each revision is identified by an 8-byte magic at the head of the file
//! and produces the same in-memory [`HrtfStore`]. Validation is strict: a
//! loader reports every violating field of the stage it is in, then fails
//! without producing a store.

use auralis_core::errors::{decode_error, Result};
use auralis_core::io::ReadBytes;

use log::{error, trace};

use crate::store::{Elevation, HrirSamples, HrtfStore};
use crate::{HRIR_DELAY_FRACBITS, HRIR_LENGTH, MAX_HRIR_DELAY};

mod v0;
mod v1;
mod v2;

const MAGIC_V0: &[u8; 8] = b"MinPHR00";
const MAGIC_V1: &[u8; 8] = b"MinPHR01";
const MAGIC_V2: &[u8; 8] = b"MinPHR02";

/// Parses a complete `.mhr` image, dispatching on the leading magic.
pub(crate) fn load_hrtf_store<B: ReadBytes>(reader: &mut B) -> Result<HrtfStore> {
    let mut magic = [0u8; 8];
    reader.read_buf_exact(&mut magic)?;

    if &magic == MAGIC_V2 {
        trace!("Detected data set format v2");
        v2::load(reader)
    }
    else if &magic == MAGIC_V1 {
        trace!("Detected data set format v1");
        v1::load(reader)
    }
    else if &magic == MAGIC_V0 {
        trace!("Detected data set format v0");
        v0::load(reader)
    }
    else {
        error!("Invalid header magic: {:?}", String::from_utf8_lossy(&magic));
        decode_error("mhr: invalid header magic")
    }
}

/// Reads one sample delay per impulse response, validates it against the
/// delay line, and stores it in fixed-point in the left slot.
fn read_mono_delays<B: ReadBytes>(reader: &mut B, count: usize) -> Result<Vec<[u8; 2]>> {
    let mut delays = vec![[0u8; 2]; count];

    let mut failed = false;
    for (i, delay) in delays.iter_mut().enumerate() {
        delay[0] = reader.read_u8()?;
        if delay[0] > MAX_HRIR_DELAY {
            error!("Invalid delays[{}]: {} (max: {})", i, delay[0], MAX_HRIR_DELAY);
            failed = true;
        }
    }
    if failed {
        return decode_error("mhr: delay exceeds the delay line");
    }

    for delay in delays.iter_mut() {
        delay[0] <<= HRIR_DELAY_FRACBITS;
    }

    Ok(delays)
}

/// Reads the packed left-ear coefficients of a 16-bit mono data set.
fn read_mono_coeffs_s16<B: ReadBytes>(
    reader: &mut B,
    ir_count: usize,
    ir_size: usize,
) -> Result<Vec<HrirSamples>> {
    let mut coeffs = vec![HrirSamples::default(); ir_count];

    for hrir in coeffs.iter_mut() {
        for sample in hrir[..ir_size].iter_mut() {
            sample[0] = f32::from(reader.read_i16()?) / 32768.0;
        }
    }

    Ok(coeffs)
}

/// Mirrors the left-ear responses of a left-only data set across the median
/// plane: azimuth `j` of a ring maps to azimuth `(az_count - j) % az_count`
/// on the opposite side.
fn mirror_left_hrirs(elevs: &[Elevation], coeffs: &mut [HrirSamples], delays: &mut [[u8; 2]]) {
    for ev in elevs {
        let az_count = usize::from(ev.az_count);
        let offset = usize::from(ev.ir_offset);

        for j in 0..az_count {
            let lidx = offset + j;
            let ridx = offset + ((az_count - j) % az_count);

            for k in 0..HRIR_LENGTH {
                coeffs[ridx][k][1] = coeffs[lidx][k][0];
            }
            delays[ridx][1] = delays[lidx][0];
        }
    }
}


#[cfg(test)]
mod tests {
    use auralis_core::errors::Error;
    use auralis_core::io::BufReader;

    use super::testdata::{v1_image, Image};
    use super::load_hrtf_store;

    #[test]
    fn verify_unknown_magic() {
        let mut im = Image::new(b"MinPHR99");
        im.u32(44100);
        let err = load_hrtf_store(&mut BufReader::new(&im.0)).unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));
    }

    #[test]
    fn verify_short_magic() {
        let err = load_hrtf_store(&mut BufReader::new(b"MinP")).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn verify_truncated_body() {
        let mut image = v1_image(44100, 8, &[1, 4, 4, 4, 1], |_, _| 0, |_| 0);
        image.truncate(image.len() - 1);
        let err = load_hrtf_store(&mut BufReader::new(&image)).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
