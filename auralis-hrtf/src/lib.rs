// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Head-related transfer function (HRTF) data sets for binaural rendering.
//!
//! An HRTF data set tabulates, over a spherical grid of directions (and
//! optionally several source distances), the stereo impulse response a sound
//! undergoes on its way to each ear. This crate enumerates the `.mhr` data
//! sets visible to a device, parses the three versioned `MinPHR` file
//! formats into an immutable [`HrtfStore`], conditions the data for the
//! device sample rate, and caches loaded stores by filename and rate under
//! reference counting.
//!
//! At render time two query engines run against a store:
//!
//! * [`HrtfStore::get_coeffs`] synthesizes the filter taps and sample delays
//!   for a point source by bilinear interpolation over the grid.
//! * [`build_bformat_hrtf`] bakes a full ambisonic decode into a
//!   [`DirectHrtfState`], optionally splitting each response into two bands
//!   so high frequencies can be weighted per ambisonic order.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// The following lints are allowed in all Auralis crates. Please see the
// workspace Cargo.toml for their justification.
#![allow(clippy::excessive_precision)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]

mod bake;
mod catalog;
mod condition;
mod formats;
mod query;
mod store;

pub use bake::{build_bformat_hrtf, DirectHrtfState};
pub use catalog::{catalog, Config, DataFiles, Hrtf, HrtfCatalog, HrtfEntry, Resources};
pub use catalog::DEFAULT_HRTF_RESOURCE;
pub use store::{AngularPoint, Elevation, Field, HrirSamples, HrtfStore};

/// Minimum effective impulse-response length, in samples.
pub const MIN_IR_SIZE: u16 = 8;
/// Maximum effective impulse-response length, in samples.
pub const MAX_IR_SIZE: u16 = 512;
/// Required impulse-response length step.
pub const MOD_IR_SIZE: u16 = 2;

/// Minimum number of field depths in a data set.
pub const MIN_FD_COUNT: u8 = 1;
/// Maximum number of field depths in a data set.
pub const MAX_FD_COUNT: u8 = 16;

/// Minimum field distance, in millimetres at the file level.
pub const MIN_FD_DISTANCE: u16 = 50;
/// Maximum field distance, in millimetres at the file level.
pub const MAX_FD_DISTANCE: u16 = 2500;

/// Minimum number of elevations per field.
pub const MIN_EV_COUNT: u8 = 5;
/// Maximum number of elevations per field.
pub const MAX_EV_COUNT: u8 = 181;

/// Minimum number of azimuths per elevation.
pub const MIN_AZ_COUNT: u16 = 1;
/// Maximum number of azimuths per elevation.
pub const MAX_AZ_COUNT: u16 = 255;

/// Length of the padded impulse-response buffers, in samples.
pub const HRIR_LENGTH: usize = 512;

/// Length of the renderer's per-source delay line, in samples.
pub const HRTF_HISTORY_LENGTH: usize = 64;
/// Largest whole-sample delay the delay line can absorb.
pub const MAX_HRIR_DELAY: u8 = (HRTF_HISTORY_LENGTH - 1) as u8;

/// Fractional bits of the fixed-point delay representation.
pub const HRIR_DELAY_FRACBITS: u32 = 2;
/// One whole sample in fixed-point delay units.
pub const HRIR_DELAY_FRACONE: u32 = 1 << HRIR_DELAY_FRACBITS;
/// Rounding bias for fixed-point delays.
pub const HRIR_DELAY_FRACHALF: u32 = HRIR_DELAY_FRACONE >> 1;

// Delays are stored in a byte, so the fixed-point range must fit one.
const _: () = assert!((MAX_HRIR_DELAY as u32) * HRIR_DELAY_FRACONE < 256);

/// Number of ambisonic channels the B-format bake can decode (third order).
pub const MAX_AMBI_CHANNELS: usize = 16;

/// Amplitude of the omnidirectional pass-through tap (`sqrt(0.5)`).
pub const PASSTHRU_COEFF: f32 = 0.707106781;
