/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The bound algorithm variant of one category and its live settings.
//!
//! Switching variants keeps every prior non-null value whose key also exists
//! in the new variant's defaults. The copy is not type-checked: same-named
//! keys are assumed to carry commensurate values.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{error, warn};

use crate::execution::{ExecutionContext, ExecutionResult};
use crate::registries::algorithm::{AlgorithmCategory, AlgorithmRegistry, AlgorithmVariant, RegistryError};
use crate::registries::settings::{SettingValue, SettingsError, SettingsMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    UnknownVariant(RegistryError),
    Settings(SettingsError),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::UnknownVariant(err) => write!(f, "{err}"),
            BindingError::Settings(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BindingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindingError::UnknownVariant(err) => Some(err),
            BindingError::Settings(err) => Some(err),
        }
    }
}

impl From<RegistryError> for BindingError {
    fn from(err: RegistryError) -> Self {
        BindingError::UnknownVariant(err)
    }
}

impl From<SettingsError> for BindingError {
    fn from(err: SettingsError) -> Self {
        BindingError::Settings(err)
    }
}

pub struct AlgorithmBinding {
    registry: Arc<AlgorithmRegistry>,
    category: AlgorithmCategory,
    variant: AlgorithmVariant,
    settings: SettingsMap,
}

impl AlgorithmBinding {
    /// Bind `variant_name` with its default settings.
    pub fn new(
        registry: Arc<AlgorithmRegistry>,
        category: AlgorithmCategory,
        variant_name: &str,
    ) -> Result<Self, BindingError> {
        let variant = registry.resolve(category, variant_name)?;
        let settings = registry.defaults_for(&variant);
        Ok(Self {
            registry,
            category,
            variant,
            settings,
        })
    }

    pub fn category(&self) -> AlgorithmCategory {
        self.category
    }

    pub fn variant(&self) -> &AlgorithmVariant {
        &self.variant
    }

    pub fn settings(&self) -> &SettingsMap {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<AlgorithmRegistry> {
        &self.registry
    }

    /// Bind another variant of the same category, carrying over shared
    /// parameter values. On error the binding is unchanged.
    pub fn switch_variant(&mut self, name: &str) -> Result<(), BindingError> {
        let variant = self
            .registry
            .resolve(self.category, name)
            .inspect_err(|err| error!("{err}"))?;

        let mut reconciled = self.registry.defaults_for(&variant);
        let carried: Vec<(String, SettingValue)> = reconciled
            .keys()
            .filter_map(|key| Some((key.to_string(), self.settings.get(key)?.clone())))
            .collect();
        for (key, value) in carried {
            reconciled.insert_unchecked(&key, Some(value));
        }

        self.variant = variant;
        self.settings = reconciled;
        Ok(())
    }

    /// Discard every override of the bound variant.
    pub fn reset_to_defaults(&mut self) {
        self.settings = self.registry.defaults_for(&self.variant);
    }

    pub fn get_parameter(&self, key: &str) -> Option<&SettingValue> {
        self.settings.get(key)
    }

    /// Type-checked update of one parameter of the bound variant.
    pub fn set_parameter(&mut self, key: &str, value: SettingValue) -> Result<(), BindingError> {
        self.settings.set(key, value).map_err(|err| {
            match &err {
                SettingsError::UnknownKey(key) => error!(
                    "Unknown parameter {key} for {} {}",
                    self.category,
                    self.variant.name()
                ),
                SettingsError::TypeMismatch { .. } => error!("{err}"),
            }
            BindingError::Settings(err)
        })
    }

    /// Overwrite a declared parameter without the kind check. Returns
    /// `false` and changes nothing when `key` is not declared.
    pub(crate) fn force_parameter(&mut self, key: &str, value: SettingValue) -> bool {
        if !self.settings.contains_key(key) {
            return false;
        }
        self.settings.insert_unchecked(key, Some(value));
        true
    }

    /// Run the bound strategy with the current settings.
    ///
    /// Cancellation, failure and panics inside the strategy all come back as
    /// data.
    pub fn execute(&self, ctx: &ExecutionContext) -> ExecutionResult {
        let strategy = self.variant.strategy();
        let outcome = catch_unwind(AssertUnwindSafe(|| strategy.run(ctx, &self.settings)));
        let result = match outcome {
            Ok(Ok(())) => ExecutionResult::Success,
            Ok(Err(err)) => ExecutionResult::from(err),
            Err(payload) => ExecutionResult::Failed(panic_message(payload.as_ref(), self.variant.name())),
        };
        match &result {
            ExecutionResult::Success => {}
            ExecutionResult::Canceled(reason) => warn!("Canceled: {reason}"),
            ExecutionResult::Failed(message) => error!("{message}"),
        }
        result
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send), name: &str) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("{name} panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{CancelToken, StrategyError};
    use crate::model::Model;
    use crate::registries::algorithm::{AlgorithmStrategy, DefaultsContext, settings_from};
    use rstest::rstest;

    /// Strategy with a fixed surface and scripted run behaviour.
    struct Scripted {
        name: &'static str,
        defaults: fn() -> SettingsMap,
        behaviour: Behaviour,
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        HonourCancel,
        Fail,
        Panic,
    }

    impl AlgorithmStrategy for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn default_settings(&self, _ctx: &DefaultsContext) -> SettingsMap {
            (self.defaults)()
        }

        fn run(&self, ctx: &ExecutionContext, settings: &SettingsMap) -> Result<(), StrategyError> {
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::HonourCancel => ctx.cancel.check(),
                Behaviour::Fail => Err(StrategyError::Failed(format!(
                    "radius was {}",
                    settings.get("RADIUS").map(ToString::to_string).unwrap_or_default()
                ))),
                Behaviour::Panic => panic!("backend exploded"),
            }
        }
    }

    fn a_defaults() -> SettingsMap {
        settings_from([
            ("RADIUS", Some(SettingValue::Double(5.0))),
            ("THRESHOLD", Some(SettingValue::Double(100.0))),
            ("ONLY_A", Some(SettingValue::Int(3))),
        ])
    }

    fn b_defaults() -> SettingsMap {
        settings_from([
            ("RADIUS", Some(SettingValue::Double(2.0))),
            ("THRESHOLD", Some(SettingValue::Int(7))),
            ("ONLY_B", Some(SettingValue::Bool(false))),
            ("ROI", None),
        ])
    }

    fn registry_with(behaviour: Behaviour) -> Arc<AlgorithmRegistry> {
        let mut registry = AlgorithmRegistry::new(DefaultsContext::default());
        registry.register(
            AlgorithmCategory::Detector,
            Arc::new(Scripted {
                name: "A",
                defaults: a_defaults,
                behaviour,
            }),
        );
        registry.register(
            AlgorithmCategory::Detector,
            Arc::new(Scripted {
                name: "B",
                defaults: b_defaults,
                behaviour,
            }),
        );
        Arc::new(registry)
    }

    fn binding(behaviour: Behaviour) -> AlgorithmBinding {
        AlgorithmBinding::new(registry_with(behaviour), AlgorithmCategory::Detector, "A").unwrap()
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(Arc::new(Model::new()), CancelToken::new())
    }

    #[test]
    fn new_with_unknown_variant_fails() {
        let err = AlgorithmBinding::new(registry_with(Behaviour::Succeed), AlgorithmCategory::Linker, "A")
            .err()
            .unwrap();
        assert!(matches!(err, BindingError::UnknownVariant(_)));
    }

    #[test]
    fn switch_carries_shared_keys_and_defaults_the_rest() {
        let mut binding = binding(Behaviour::Succeed);
        binding.set_parameter("RADIUS", SettingValue::Double(8.0)).unwrap();
        binding.set_parameter("ONLY_A", SettingValue::Int(9)).unwrap();

        binding.switch_variant("B").unwrap();

        assert_eq!(binding.variant().name(), "B");
        assert_eq!(binding.get_parameter("RADIUS"), Some(&SettingValue::Double(8.0)));
        assert_eq!(binding.get_parameter("ONLY_B"), Some(&SettingValue::Bool(false)));
        assert!(!binding.settings().contains_key("ONLY_A"));
        assert!(binding.settings().contains_key("ROI"));
    }

    #[test]
    fn switch_round_trip_restores_unique_defaults() {
        let mut binding = binding(Behaviour::Succeed);
        binding.set_parameter("RADIUS", SettingValue::Double(8.0)).unwrap();
        binding.set_parameter("ONLY_A", SettingValue::Int(9)).unwrap();

        binding.switch_variant("B").unwrap();
        binding.switch_variant("A").unwrap();

        assert_eq!(binding.get_parameter("RADIUS"), Some(&SettingValue::Double(8.0)));
        assert_eq!(binding.get_parameter("ONLY_A"), Some(&SettingValue::Int(3)));
    }

    #[test]
    fn switch_copies_shared_key_without_kind_check() {
        let mut binding = binding(Behaviour::Succeed);

        binding.switch_variant("B").unwrap();

        // A declares THRESHOLD as Double, B as Int; A's value wins.
        assert_eq!(binding.get_parameter("THRESHOLD"), Some(&SettingValue::Double(100.0)));
    }

    #[test]
    fn switch_to_unknown_variant_leaves_binding_unchanged() {
        let mut binding = binding(Behaviour::Succeed);
        binding.set_parameter("RADIUS", SettingValue::Double(8.0)).unwrap();
        let before = binding.settings().clone();

        let err = binding.switch_variant("C").unwrap_err();

        assert_eq!(
            err,
            BindingError::UnknownVariant(RegistryError::NotFound {
                category: AlgorithmCategory::Detector,
                name: "C".to_string()
            })
        );
        assert_eq!(binding.variant().name(), "A");
        assert_eq!(binding.settings(), &before);
    }

    #[test]
    fn reset_discards_overrides() {
        let mut binding = binding(Behaviour::Succeed);
        binding.set_parameter("RADIUS", SettingValue::Double(8.0)).unwrap();

        binding.reset_to_defaults();

        assert_eq!(binding.settings(), &a_defaults());
    }

    #[test]
    fn set_parameter_rejects_unknown_key_and_kind_change() {
        let mut binding = binding(Behaviour::Succeed);
        let before = binding.settings().clone();

        assert!(matches!(
            binding.set_parameter("ONLY_B", SettingValue::Bool(true)),
            Err(BindingError::Settings(SettingsError::UnknownKey(_)))
        ));
        assert!(matches!(
            binding.set_parameter("RADIUS", SettingValue::Int(8)),
            Err(BindingError::Settings(SettingsError::TypeMismatch { .. }))
        ));
        assert_eq!(binding.settings(), &before);
    }

    #[test]
    fn force_parameter_stays_within_surface() {
        let mut binding = binding(Behaviour::Succeed);
        assert!(binding.force_parameter("THRESHOLD", SettingValue::Int(1)));
        assert!(!binding.force_parameter("ONLY_B", SettingValue::Bool(true)));
        assert!(!binding.settings().contains_key("ONLY_B"));
    }

    #[rstest]
    #[case(Behaviour::Succeed, ExecutionResult::Success)]
    #[case(Behaviour::Fail, ExecutionResult::Failed("radius was 5.0".to_string()))]
    #[case(Behaviour::Panic, ExecutionResult::Failed("A panicked: backend exploded".to_string()))]
    fn execute_maps_outcomes(#[case] behaviour: Behaviour, #[case] expected: ExecutionResult) {
        assert_eq!(binding(behaviour).execute(&context()), expected);
    }

    #[test]
    fn execute_reports_cooperative_cancel() {
        let binding = binding(Behaviour::HonourCancel);
        let ctx = context();
        assert_eq!(binding.execute(&ctx), ExecutionResult::Success);

        ctx.cancel.cancel("stop requested");

        assert_eq!(
            binding.execute(&ctx),
            ExecutionResult::Canceled("stop requested".to_string())
        );
    }
}
