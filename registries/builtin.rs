/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Built-in detector and linker catalogue entries.
//!
//! These declare names, descriptions and parameter surfaces only. Running
//! one reports `Failed` until a host registers a strategy with a real
//! backend under the same name.

use std::sync::Arc;

use crate::execution::{ExecutionContext, StrategyError};
use crate::registries::algorithm::{
    AlgorithmCategory, AlgorithmRegistry, AlgorithmStrategy, DefaultsContext, settings_from,
};
use crate::registries::settings::{SettingValue, SettingsMap};

pub const DETECTOR_DOG: &str = "DoG detector";
pub const DETECTOR_LOG: &str = "LoG detector";
pub const DETECTOR_ADVANCED_DOG: &str = "Advanced DoG detector";
pub const LINKER_SIMPLE_LAP: &str = "Simple LAP linker";
pub const LINKER_LAP: &str = "LAP linker";

pub const KEY_SETUP_ID: &str = "SETUP_ID";
pub const KEY_MIN_TIMEPOINT: &str = "MIN_TIMEPOINT";
pub const KEY_MAX_TIMEPOINT: &str = "MAX_TIMEPOINT";
pub const KEY_RADIUS: &str = "RADIUS";
pub const KEY_THRESHOLD: &str = "THRESHOLD";
pub const KEY_ROI: &str = "ROI";
pub const KEY_ADD_BEHAVIOR: &str = "ADD_BEHAVIOR";
pub const KEY_DETECTION_TYPE: &str = "DETECTION_TYPE";
pub const KEY_LINKING_MAX_DISTANCE: &str = "LINKING_MAX_DISTANCE";
pub const KEY_GAP_CLOSING_MAX_DISTANCE: &str = "GAP_CLOSING_MAX_DISTANCE";
pub const KEY_GAP_CLOSING_MAX_FRAME_GAP: &str = "GAP_CLOSING_MAX_FRAME_GAP";
pub const KEY_ALLOW_GAP_CLOSING: &str = "ALLOW_GAP_CLOSING";
pub const KEY_ALLOW_TRACK_SPLITTING: &str = "ALLOW_TRACK_SPLITTING";
pub const KEY_SPLITTING_MAX_DISTANCE: &str = "SPLITTING_MAX_DISTANCE";
pub const KEY_ALLOW_TRACK_MERGING: &str = "ALLOW_TRACK_MERGING";
pub const KEY_MERGING_MAX_DISTANCE: &str = "MERGING_MAX_DISTANCE";
pub const KEY_ALTERNATIVE_LINKING_COST_FACTOR: &str = "ALTERNATIVE_LINKING_COST_FACTOR";
pub const KEY_CUTOFF_PERCENTILE: &str = "CUTOFF_PERCENTILE";

const DEFAULT_RADIUS: f64 = 5.0;
const DEFAULT_THRESHOLD: f64 = 1000.0;
const DEFAULT_LINKING_MAX_DISTANCE: f64 = 10.0;
const DEFAULT_GAP_CLOSING_MAX_DISTANCE: f64 = 15.0;
const DEFAULT_GAP_CLOSING_MAX_FRAME_GAP: i64 = 2;

#[derive(Debug, Clone, Copy)]
enum DetectorFlavor {
    Dog,
    Log,
    AdvancedDog,
}

struct CatalogDetector {
    name: &'static str,
    description: &'static str,
    flavor: DetectorFlavor,
}

impl AlgorithmStrategy for CatalogDetector {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn default_settings(&self, ctx: &DefaultsContext) -> SettingsMap {
        let mut settings = settings_from([
            (KEY_SETUP_ID, Some(SettingValue::Int(0))),
            (KEY_MIN_TIMEPOINT, Some(SettingValue::Int(0))),
            (KEY_MAX_TIMEPOINT, Some(SettingValue::Int(last_timepoint(ctx)))),
            (KEY_RADIUS, Some(SettingValue::Double(DEFAULT_RADIUS))),
            (KEY_THRESHOLD, Some(SettingValue::Double(DEFAULT_THRESHOLD))),
            (KEY_ROI, None),
        ]);
        if let DetectorFlavor::AdvancedDog = self.flavor {
            settings.insert_unchecked(KEY_ADD_BEHAVIOR, None);
            settings.insert_unchecked(KEY_DETECTION_TYPE, None);
        }
        settings
    }

    fn run(&self, ctx: &ExecutionContext, _settings: &SettingsMap) -> Result<(), StrategyError> {
        ctx.cancel.check()?;
        Err(no_backend(self.name))
    }
}

#[derive(Debug, Clone, Copy)]
enum LinkerFlavor {
    SimpleLap,
    Lap,
}

struct CatalogLinker {
    name: &'static str,
    description: &'static str,
    flavor: LinkerFlavor,
}

impl AlgorithmStrategy for CatalogLinker {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn default_settings(&self, ctx: &DefaultsContext) -> SettingsMap {
        let mut settings = settings_from([
            (KEY_MIN_TIMEPOINT, Some(SettingValue::Int(0))),
            (KEY_MAX_TIMEPOINT, Some(SettingValue::Int(last_timepoint(ctx)))),
            (
                KEY_LINKING_MAX_DISTANCE,
                Some(SettingValue::Double(DEFAULT_LINKING_MAX_DISTANCE)),
            ),
            (
                KEY_GAP_CLOSING_MAX_DISTANCE,
                Some(SettingValue::Double(DEFAULT_GAP_CLOSING_MAX_DISTANCE)),
            ),
            (
                KEY_GAP_CLOSING_MAX_FRAME_GAP,
                Some(SettingValue::Int(DEFAULT_GAP_CLOSING_MAX_FRAME_GAP)),
            ),
        ]);
        if let LinkerFlavor::Lap = self.flavor {
            settings.insert_unchecked(KEY_ALLOW_GAP_CLOSING, Some(SettingValue::Bool(true)));
            settings.insert_unchecked(KEY_ALLOW_TRACK_SPLITTING, Some(SettingValue::Bool(false)));
            settings.insert_unchecked(KEY_SPLITTING_MAX_DISTANCE, Some(SettingValue::Double(15.0)));
            settings.insert_unchecked(KEY_ALLOW_TRACK_MERGING, Some(SettingValue::Bool(false)));
            settings.insert_unchecked(KEY_MERGING_MAX_DISTANCE, Some(SettingValue::Double(15.0)));
            settings.insert_unchecked(
                KEY_ALTERNATIVE_LINKING_COST_FACTOR,
                Some(SettingValue::Double(1.05)),
            );
            settings.insert_unchecked(KEY_CUTOFF_PERCENTILE, Some(SettingValue::Double(0.9)));
        }
        settings
    }

    fn run(&self, ctx: &ExecutionContext, _settings: &SettingsMap) -> Result<(), StrategyError> {
        ctx.cancel.check()?;
        Err(no_backend(self.name))
    }
}

fn last_timepoint(ctx: &DefaultsContext) -> i64 {
    i64::from(ctx.num_timepoints.saturating_sub(1))
}

fn no_backend(name: &str) -> StrategyError {
    StrategyError::Failed(format!("no execution backend registered for '{name}'"))
}

pub(crate) fn register_builtin_variants(registry: &mut AlgorithmRegistry) {
    let detectors = [
        CatalogDetector {
            name: DETECTOR_DOG,
            description: "<html>This detector applies a Difference of Gaussians filter \
                to the image and keeps local maxima above the threshold. \
                <p>Best for spots of roughly uniform size.</html>",
            flavor: DetectorFlavor::Dog,
        },
        CatalogDetector {
            name: DETECTOR_LOG,
            description: "<html>This detector applies a Laplacian of Gaussian filter \
                tuned to the expected spot radius. <p>Slower than the DoG detector \
                but more accurate for large spots.</html>",
            flavor: DetectorFlavor::Log,
        },
        CatalogDetector {
            name: DETECTOR_ADVANCED_DOG,
            description: "<html>Difference of Gaussians detector with control over \
                how new detections interact with existing spots (ADD_BEHAVIOR) and \
                whether maxima or minima are detected (DETECTION_TYPE).</html>",
            flavor: DetectorFlavor::AdvancedDog,
        },
    ];
    for detector in detectors {
        registry.register(AlgorithmCategory::Detector, Arc::new(detector));
    }

    let linkers = [
        CatalogLinker {
            name: LINKER_SIMPLE_LAP,
            description: "<html>Links spots frame to frame by solving a linear \
                assignment problem on squared distances, then closes gaps. \
                <p>No track splitting or merging.</html>",
            flavor: LinkerFlavor::SimpleLap,
        },
        CatalogLinker {
            name: LINKER_LAP,
            description: "<html>Linear assignment problem linker with gap closing, \
                track splitting and track merging.</html>",
            flavor: LinkerFlavor::Lap,
        },
    ];
    for linker in linkers {
        registry.register(AlgorithmCategory::Linker, Arc::new(linker));
    }
}
