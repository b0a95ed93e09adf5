/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! One detector binding and one linker binding over a shared model.

use std::fmt::Write as _;
use std::sync::Arc;

use log::info;

use crate::config::TrackingConfig;
use crate::execution::{CancelToken, ExecutionContext, ExecutionResult};
use crate::model::Model;
use crate::registries::builtin::{
    KEY_GAP_CLOSING_MAX_DISTANCE, KEY_GAP_CLOSING_MAX_FRAME_GAP, KEY_LINKING_MAX_DISTANCE,
    KEY_RADIUS, KEY_THRESHOLD,
};
use crate::registries::{
    AlgorithmBinding, AlgorithmCategory, AlgorithmRegistry, BindingError, SettingValue,
};

pub struct TrackingSession {
    model: Arc<Model>,
    detector: AlgorithmBinding,
    linker: AlgorithmBinding,
}

impl TrackingSession {
    /// Bind the configured default detector and linker.
    pub fn new(
        model: Arc<Model>,
        registry: Arc<AlgorithmRegistry>,
        tracking: &TrackingConfig,
    ) -> Result<Self, BindingError> {
        let detector = AlgorithmBinding::new(
            registry.clone(),
            AlgorithmCategory::Detector,
            &tracking.default_detector,
        )?;
        let linker = AlgorithmBinding::new(registry, AlgorithmCategory::Linker, &tracking.default_linker)?;
        Ok(Self {
            model,
            detector,
            linker,
        })
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn detector(&self) -> &AlgorithmBinding {
        &self.detector
    }

    pub fn linker(&self) -> &AlgorithmBinding {
        &self.linker
    }

    pub fn use_detector(&mut self, name: &str) -> Result<(), BindingError> {
        self.detector.switch_variant(name)
    }

    pub fn use_linker(&mut self, name: &str) -> Result<(), BindingError> {
        self.linker.switch_variant(name)
    }

    pub fn reset_detector_settings(&mut self) {
        self.detector.reset_to_defaults();
    }

    pub fn reset_linker_settings(&mut self) {
        self.linker.reset_to_defaults();
    }

    pub fn set_detector_setting(&mut self, key: &str, value: impl Into<SettingValue>) -> Result<(), BindingError> {
        self.detector.set_parameter(key, value.into())
    }

    pub fn set_linker_setting(&mut self, key: &str, value: impl Into<SettingValue>) -> Result<(), BindingError> {
        self.linker.set_parameter(key, value.into())
    }

    /// Detection only. Records an undo point on success.
    pub fn detect(&self, cancel: &CancelToken) -> ExecutionResult {
        self.run_steps(&[&self.detector], cancel)
    }

    /// Linking only. Records an undo point on success.
    pub fn link(&self, cancel: &CancelToken) -> ExecutionResult {
        self.run_steps(&[&self.linker], cancel)
    }

    /// Detection then linking. Stops at the first step that does not
    /// succeed; records one undo point when both succeed.
    pub fn run(&self, cancel: &CancelToken) -> ExecutionResult {
        self.run_steps(&[&self.detector, &self.linker], cancel)
    }

    /// Set the detection radius and threshold, then detect.
    pub fn detect_with(&mut self, radius: f64, threshold: f64, cancel: &CancelToken) -> ExecutionResult {
        self.detector.force_parameter(KEY_RADIUS, SettingValue::Double(radius));
        self.detector
            .force_parameter(KEY_THRESHOLD, SettingValue::Double(threshold));
        self.detect(cancel)
    }

    /// Set the linking and gap-closing distance and the frame gap, then link.
    pub fn link_with(&mut self, max_distance: f64, max_frame_gap: i64, cancel: &CancelToken) -> ExecutionResult {
        self.linker
            .force_parameter(KEY_LINKING_MAX_DISTANCE, SettingValue::Double(max_distance));
        self.linker
            .force_parameter(KEY_GAP_CLOSING_MAX_DISTANCE, SettingValue::Double(max_distance));
        self.linker
            .force_parameter(KEY_GAP_CLOSING_MAX_FRAME_GAP, SettingValue::Int(max_frame_gap));
        self.link(cancel)
    }

    /// Current variants and settings as text.
    pub fn describe(&self) -> String {
        let mut out = String::from("Tracking settings:\n");
        for binding in [&self.detector, &self.linker] {
            let _ = writeln!(
                out,
                "{}: {}",
                capitalized(binding.category().label()),
                binding.variant().name()
            );
            out.push_str(&binding.settings().to_string());
        }
        out
    }

    fn run_steps(&self, steps: &[&AlgorithmBinding], cancel: &CancelToken) -> ExecutionResult {
        let ctx = ExecutionContext::new(self.model.clone(), cancel.clone());
        for binding in steps {
            info!("Starting {} '{}'.", binding.category(), binding.variant().name());
            let result = binding.execute(&ctx);
            if !result.is_success() {
                return result;
            }
        }
        self.model.set_undo_point();
        info!("{}", self.model.summary());
        ExecutionResult::Success
    }
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
