/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Algorithm catalogue, typed settings and variant bindings.

pub mod algorithm;
pub mod binding;
pub mod builtin;
pub mod settings;

pub use algorithm::{
    AlgorithmCategory, AlgorithmRegistry, AlgorithmStrategy, AlgorithmVariant, DefaultsContext,
    RegistryError,
};
pub use binding::{AlgorithmBinding, BindingError};
pub use settings::{SettingKind, SettingValue, SettingsError, SettingsMap};
