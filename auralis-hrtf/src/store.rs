// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The in-memory representation of one loaded HRTF data set.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::HRIR_LENGTH;

/// A group of impulse responses measured at a fixed source distance.
#[derive(Clone, Copy, Debug)]
pub struct Field {
    /// Source distance in metres. Zero for data sets without distance
    /// information.
    pub distance: f32,
    /// Number of elevation rings in this field.
    pub ev_count: u8,
}

/// One ring of impulse responses at a fixed elevation.
#[derive(Clone, Copy, Debug)]
pub struct Elevation {
    /// Number of azimuths in this ring.
    pub az_count: u16,
    /// Index of the ring's first impulse response in the coefficient and
    /// delay tables.
    pub ir_offset: u16,
}

/// A stereo impulse-response tap buffer.
///
/// The tail past the owning store's effective IR size is kept zeroed, so
/// accumulation loops may run full length. Rows are 16-byte aligned for
/// SIMD-friendly access.
#[derive(Clone, Copy)]
#[repr(align(16))]
pub struct HrirSamples(pub [[f32; 2]; HRIR_LENGTH]);

impl Default for HrirSamples {
    fn default() -> Self {
        HrirSamples([[0.0; 2]; HRIR_LENGTH])
    }
}

impl Deref for HrirSamples {
    type Target = [[f32; 2]; HRIR_LENGTH];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for HrirSamples {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// A direction on the listener's sphere, in radians. Elevation lies in
/// `[-pi/2, pi/2]`, azimuth in `[-pi, pi]`.
#[derive(Clone, Copy, Debug)]
pub struct AngularPoint {
    pub elevation: f32,
    pub azimuth: f32,
}

/// One immutable HRTF data set at a chosen sample rate.
///
/// The fields are ordered farthest first, so walking from index 0 selects
/// the nearest field not exceeding a queried distance. Each field's
/// elevation rings are contiguous in the elevation table, and each ring's
/// impulse responses are contiguous in the coefficient and delay tables,
/// starting at the ring's `ir_offset`.
pub struct HrtfStore {
    pub(crate) sample_rate: u32,
    pub(crate) ir_size: u16,
    pub(crate) fields: Box<[Field]>,
    pub(crate) elevs: Box<[Elevation]>,
    pub(crate) coeffs: Box<[HrirSamples]>,
    pub(crate) delays: Box<[[u8; 2]]>,
}

impl HrtfStore {
    /// Assembles a store from freshly parsed tables.
    ///
    /// The loaders have validated every bound already; this constructor only
    /// re-establishes the zeroed coefficient tails past `ir_size`.
    pub(crate) fn new(
        sample_rate: u32,
        ir_size: u16,
        fields: Vec<Field>,
        elevs: Vec<Elevation>,
        coeffs: Vec<HrirSamples>,
        delays: Vec<[u8; 2]>,
    ) -> Self {
        debug_assert!(!fields.is_empty());
        debug_assert_eq!(elevs.len(), fields.iter().map(|f| usize::from(f.ev_count)).sum::<usize>());
        debug_assert_eq!(coeffs.len(), elevs.iter().map(|e| usize::from(e.az_count)).sum::<usize>());
        debug_assert_eq!(coeffs.len(), delays.len());

        let mut store = HrtfStore {
            sample_rate,
            ir_size,
            fields: fields.into_boxed_slice(),
            elevs: elevs.into_boxed_slice(),
            coeffs: coeffs.into_boxed_slice(),
            delays: delays.into_boxed_slice(),
        };
        store.zero_coeff_tails();
        store
    }

    /// The effective sample rate. May differ from the file rate after
    /// conditioning.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The effective impulse-response length, in samples.
    pub fn ir_size(&self) -> u16 {
        self.ir_size
    }

    /// The field-depth table, ordered farthest first.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The elevation table, grouped by field.
    pub fn elevations(&self) -> &[Elevation] {
        &self.elevs
    }

    /// The stereo tap table, one row per impulse response.
    pub fn coeffs(&self) -> &[HrirSamples] {
        &self.coeffs
    }

    /// The fixed-point delay table, one `[left, right]` pair per impulse
    /// response.
    pub fn delays(&self) -> &[[u8; 2]] {
        &self.delays
    }

    /// Zeroes every coefficient past the effective IR size.
    pub(crate) fn zero_coeff_tails(&mut self) {
        let ir_size = usize::from(self.ir_size);
        for hrir in self.coeffs.iter_mut() {
            for sample in hrir[ir_size..].iter_mut() {
                *sample = [0.0; 2];
            }
        }
    }
}

impl fmt::Debug for HrtfStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HrtfStore")
            .field("sample_rate", &self.sample_rate)
            .field("ir_size", &self.ir_size)
            .field("fields", &self.fields)
            .field("ir_count", &self.coeffs.len())
            .finish()
    }
}
