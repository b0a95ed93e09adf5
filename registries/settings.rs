/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Typed key/value settings for detector and linker variants.
//!
//! The key set of a variant's default map is its whole parameter surface:
//! `set` never introduces a key, and refuses a value whose kind differs
//! from the kind already stored under that key.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Int,
    Double,
    Bool,
    Text,
    Interval,
}

impl SettingKind {
    /// Type label used in parameter tables.
    pub fn label(self) -> &'static str {
        match self {
            SettingKind::Int => "Integer",
            SettingKind::Double => "Double",
            SettingKind::Bool => "Boolean",
            SettingKind::Text => "String",
            SettingKind::Interval => "Interval",
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    Text(String),
    /// Inclusive pixel bounds, x/y/z.
    Interval { min: [i64; 3], max: [i64; 3] },
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Int(_) => SettingKind::Int,
            SettingValue::Double(_) => SettingKind::Double,
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::Text(_) => SettingKind::Text,
            SettingValue::Interval { .. } => SettingKind::Interval,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            SettingValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Int(value) => write!(f, "{value}"),
            SettingValue::Double(value) => write!(f, "{value:?}"),
            SettingValue::Bool(value) => write!(f, "{value}"),
            SettingValue::Text(value) => f.write_str(value),
            SettingValue::Interval { min, max } => write!(
                f,
                "[{}, {}, {}] -> [{}, {}, {}]",
                min[0], min[1], min[2], max[0], max[1], max[2]
            ),
        }
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Double(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    UnknownKey(String),
    TypeMismatch {
        key: String,
        expected: SettingKind,
        found: SettingKind,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::UnknownKey(key) => write!(f, "Unknown parameter {key}"),
            SettingsError::TypeMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "Incorrect value type for parameter {key}. Expected {expected} but got {found}"
            ),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Parameter map of one algorithm variant. Absent values are stored as
/// `None` and accept any kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsMap {
    entries: BTreeMap<String, Option<SettingValue>>,
}

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`; `None` for both unknown keys and null values.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.entries.get(key)?.as_ref()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in key order, null values included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&SettingValue>)> + '_ {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite an existing key with a value of the same kind.
    ///
    /// A stored null accepts any kind. On error the map is unchanged.
    pub fn set(&mut self, key: &str, value: SettingValue) -> Result<(), SettingsError> {
        let slot = self
            .entries
            .get_mut(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        if let Some(existing) = slot.as_ref()
            && existing.kind() != value.kind()
        {
            return Err(SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: existing.kind(),
                found: value.kind(),
            });
        }
        *slot = Some(value);
        Ok(())
    }

    /// Insert or overwrite without surface or kind checks. Used to build
    /// default maps and to carry values across variant switches.
    pub fn insert_unchecked(&mut self, key: &str, value: Option<SettingValue>) {
        self.entries.insert(key.to_string(), value);
    }
}

impl fmt::Display for SettingsMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            match value {
                Some(value) => writeln!(f, "  {key} = {value}")?,
                None => writeln!(f, "  {key} = null")?,
            }
        }
        Ok(())
    }
}
