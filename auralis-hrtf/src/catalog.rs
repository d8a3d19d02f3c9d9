// Auralis
// Copyright (c) 2026 The Project Auralis Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Enumeration of available HRTF data sets and the loaded-store cache.

use std::fs;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use auralis_core::io::BufReader;

use log::{error, trace, warn};
use once_cell::sync::Lazy;

use crate::condition;
use crate::formats;
use crate::store::HrtfStore;

/// Configuration options, provided by the embedding application. Lookups
/// fall back from the device scope to the global scope internally.
pub trait Config {
    /// Looks up a string option.
    fn get_str(&self, devname: Option<&str>, key: &str) -> Option<String>;

    /// Looks up an unsigned integer option.
    fn get_uint(&self, devname: Option<&str>, key: &str) -> Option<u32>;
}

/// Locates data files matching an extension under a logical data path.
pub trait DataFiles {
    fn search(&self, ext: &str, subdir: &str) -> Vec<PathBuf>;
}

/// Embedded binary resources. An absent resource yields an empty slice.
pub trait Resources {
    fn get(&self, idx: u32) -> &[u8];
}

/// Resource index of the built-in HRTF data set.
pub const DEFAULT_HRTF_RESOURCE: u32 = 1;

/// One enumerated HRTF data set.
#[derive(Clone, Debug)]
pub struct HrtfEntry {
    /// De-duplicated human-readable name.
    pub disp_name: String,
    /// Backing path, or the synthetic `!<idx>_<name>` form for an embedded
    /// resource.
    pub filename: String,
}

/// One cache slot. Multiple slots may share a filename, one per sample
/// rate.
struct LoadedHrtf {
    filename: String,
    entry: Arc<HrtfStore>,
}

type LoadedList = Mutex<Vec<LoadedHrtf>>;

/// The enumerated-set list and the loaded-store cache.
///
/// One catalog is shared per process (see [`catalog`]); separate instances
/// exist so tests stay hermetic. Lock order is the enumerated list before
/// the loaded cache, never the inverse.
pub struct HrtfCatalog {
    enumerated: Mutex<Vec<HrtfEntry>>,
    loaded: Arc<LoadedList>,
}

/// A shared reference to a loaded store.
///
/// Cloning raises the store's reference count and dropping lowers it;
/// dropping the last reference outside the cache sweeps every unreferenced
/// cache slot, preserving the order of the survivors.
///
/// The store is held in an `Option` so the drop can release it while the
/// cache lock is held; it is `Some` for the handle's whole life.
pub struct Hrtf {
    store: Option<Arc<HrtfStore>>,
    loaded: Arc<LoadedList>,
}

impl Hrtf {
    fn store(&self) -> &Arc<HrtfStore> {
        self.store.as_ref().expect("live handle holds a store")
    }
}

impl Deref for Hrtf {
    type Target = HrtfStore;

    fn deref(&self) -> &HrtfStore {
        self.store()
    }
}

impl Clone for Hrtf {
    fn clone(&self) -> Self {
        let store = Arc::clone(self.store());
        trace!("Increasing refcount, now {}", Arc::strong_count(&store) - 1);
        Hrtf { store: Some(store), loaded: Arc::clone(&self.loaded) }
    }
}

impl Drop for Hrtf {
    fn drop(&mut self) {
        // Release this handle's count while the cache lock is held; field
        // drops only run after this body, which would let two concurrent
        // last-handle drops each observe the other's count as still live
        // and each leave the sweep to the other.
        let mut loaded = self.loaded.lock().unwrap();
        if let Some(store) = self.store.take() {
            trace!("Decreasing refcount, now {}", Arc::strong_count(&store) - 2);
            drop(store);
        }
        loaded.retain(|slot| Arc::strong_count(&slot.entry) > 1);
    }
}

impl Default for HrtfCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl HrtfCatalog {
    pub fn new() -> Self {
        HrtfCatalog { enumerated: Mutex::new(Vec::new()), loaded: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Rebuilds the enumerated list and returns the display names in order,
    /// with a configured `default-hrtf` rotated to the front.
    ///
    /// The `hrtf-paths` option is a comma-separated path list. Default
    /// locations (the `openal/hrtf` logical path plus the built-in
    /// resource) are searched when the option is absent, when the parsed
    /// list is empty, or when the list ends cleanly in a bare entry; a
    /// trailing separator forces the defaults off.
    pub fn enumerate(
        &self,
        config: &dyn Config,
        files: &dyn DataFiles,
        resources: &dyn Resources,
        devname: Option<&str>,
    ) -> Vec<String> {
        let mut enumerated = self.enumerated.lock().unwrap();
        enumerated.clear();

        let mut use_defaults = true;
        if let Some(pathlist) = config.get_str(devname, "hrtf-paths") {
            let mut rest = pathlist.as_str();
            while !rest.is_empty() {
                rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
                if rest.is_empty() {
                    break;
                }

                let entry = match rest.find(',') {
                    Some(pos) => {
                        let entry = &rest[..pos];
                        rest = &rest[pos + 1..];
                        use_defaults = false;
                        entry
                    }
                    None => {
                        let entry = rest;
                        rest = "";
                        use_defaults = true;
                        entry
                    }
                };

                let entry = entry.trim();
                if !entry.is_empty() {
                    for fname in files.search(".mhr", entry) {
                        add_file_entry(&mut enumerated, fname.to_string_lossy().into_owned());
                    }
                }
            }
        }

        if use_defaults {
            for fname in files.search(".mhr", "openal/hrtf") {
                add_file_entry(&mut enumerated, fname.to_string_lossy().into_owned());
            }
            if !resources.get(DEFAULT_HRTF_RESOURCE).is_empty() {
                add_builtin_entry(&mut enumerated, "Built-In HRTF", DEFAULT_HRTF_RESOURCE);
            }
        }

        let mut list: Vec<String> = enumerated.iter().map(|e| e.disp_name.clone()).collect();

        if let Some(default) = config.get_str(devname, "default-hrtf") {
            match list.iter().position(|name| *name == default) {
                None => warn!("Failed to find default HRTF \"{}\"", default),
                Some(0) => (),
                Some(pos) => list[..=pos].rotate_right(1),
            }
        }

        list
    }

    /// Returns a reference-counted handle to the named data set, loading
    /// and conditioning it for `devrate` on first use. Returns `None` for
    /// unknown names and load failures.
    pub fn get_loaded(
        &self,
        config: &dyn Config,
        resources: &dyn Resources,
        name: &str,
        devname: Option<&str>,
        devrate: u32,
    ) -> Option<Hrtf> {
        // Lock order: the enumerated list first, then the loaded cache.
        let enumerated = self.enumerated.lock().unwrap();
        let fname = enumerated.iter().find(|e| e.disp_name == name)?.filename.clone();

        let mut loaded = self.loaded.lock().unwrap();

        // The cache is sorted by filename; slots sharing it differ by rate.
        let mut idx = loaded.partition_point(|slot| slot.filename.as_str() < fname.as_str());
        while idx < loaded.len() && loaded[idx].filename == fname {
            if loaded[idx].entry.sample_rate() == devrate {
                let store = Arc::clone(&loaded[idx].entry);
                trace!("Increasing refcount, now {}", Arc::strong_count(&store) - 1);
                return Some(Hrtf { store: Some(store), loaded: Arc::clone(&self.loaded) });
            }
            idx += 1;
        }

        trace!("Loading {}...", fname);
        let data: Vec<u8> = match parse_resource_name(&fname) {
            Some(residx) => {
                let res = resources.get(residx);
                if res.is_empty() {
                    error!("Could not get resource {}, {}", residx, name);
                    return None;
                }
                res.to_vec()
            }
            None => match fs::read(&fname) {
                Ok(data) => data,
                Err(err) => {
                    error!("Could not open {}: {}", fname, err);
                    return None;
                }
            },
        };

        let mut store = match formats::load_hrtf_store(&mut BufReader::new(&data)) {
            Ok(store) => store,
            Err(err) => {
                error!("Failed reading {}: {}", name, err);
                return None;
            }
        };

        if store.sample_rate() != devrate {
            trace!("Resampling HRTF {} ({}hz -> {}hz)", name, store.sample_rate(), devrate);
            condition::resample_store(&mut store, devrate);
        }

        // The IR-size override applies on first load only; a cache hit
        // above returns the published size unchanged.
        if let Some(size) = config.get_uint(devname, "hrtf-size") {
            condition::clamp_ir_size(&mut store, size.min(u32::from(u16::MAX)) as u16);
        }

        trace!(
            "Loaded HRTF {} for sample rate {}hz, {}-sample filter",
            name,
            store.sample_rate(),
            store.ir_size()
        );

        let store = Arc::new(store);
        loaded.insert(idx, LoadedHrtf { filename: fname, entry: Arc::clone(&store) });
        Some(Hrtf { store: Some(store), loaded: Arc::clone(&self.loaded) })
    }

    #[cfg(test)]
    pub(crate) fn loaded_len(&self) -> usize {
        self.loaded.lock().unwrap().len()
    }
}

/// The process-wide catalog.
pub fn catalog() -> &'static HrtfCatalog {
    static CATALOG: Lazy<HrtfCatalog> = Lazy::new(HrtfCatalog::new);
    &CATALOG
}

/// Extracts the resource index from a synthetic `!<idx>_<name>` filename.
fn parse_resource_name(fname: &str) -> Option<u32> {
    let rest = fname.strip_prefix('!')?;
    let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 || !rest[digits_end..].starts_with('_') {
        return None;
    }
    rest[..digits_end].parse().ok()
}

fn add_file_entry(enumerated: &mut Vec<HrtfEntry>, filename: String) {
    // Skip files that have already been enumerated.
    if enumerated.iter().any(|e| e.filename == filename) {
        trace!("Skipping duplicate file entry {}", filename);
        return;
    }

    let namepos = filename.rfind(|c| c == '/' || c == '\\').map_or(0, |p| p + 1);
    let basename = match filename.rfind('.') {
        Some(extpos) if extpos > namepos => &filename[namepos..extpos],
        _ => &filename[namepos..],
    };

    let disp_name = unique_display_name(enumerated, basename);
    trace!("Adding file entry \"{}\"", filename);
    enumerated.push(HrtfEntry { disp_name, filename });
}

fn add_builtin_entry(enumerated: &mut Vec<HrtfEntry>, name: &str, residx: u32) {
    let filename = format!("!{}_{}", residx, name);
    if enumerated.iter().any(|e| e.filename == filename) {
        trace!("Skipping duplicate file entry {}", filename);
        return;
    }

    let disp_name = unique_display_name(enumerated, name);
    trace!("Adding built-in entry \"{}\"", filename);
    enumerated.push(HrtfEntry { disp_name, filename });
}

/// De-duplicates a display name against the enumerated list with `" #N"`
/// suffixes.
fn unique_display_name(enumerated: &[HrtfEntry], basename: &str) -> String {
    let mut name = basename.to_string();
    let mut count = 1;
    while enumerated.iter().any(|e| e.disp_name == name) {
        count += 1;
        name = format!("{} #{}", basename, count);
    }
    name
}
