/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Detector and linker catalogue.
//!
//! Variants are trait objects registered per category and resolved by exact,
//! case-sensitive display name. Listing order is registration order.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::execution::{ExecutionContext, StrategyError};
use crate::registries::settings::{SettingsMap, SettingValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmCategory {
    Detector,
    Linker,
}

impl AlgorithmCategory {
    pub fn label(self) -> &'static str {
        match self {
            AlgorithmCategory::Detector => "detector",
            AlgorithmCategory::Linker => "linker",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            AlgorithmCategory::Detector => "detectors",
            AlgorithmCategory::Linker => "linkers",
        }
    }
}

impl fmt::Display for AlgorithmCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inert inputs available while computing default settings.
///
/// Holds no model handle, so reading defaults cannot touch shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultsContext {
    pub num_timepoints: u32,
}

impl Default for DefaultsContext {
    fn default() -> Self {
        Self { num_timepoints: 1 }
    }
}

/// One pluggable detection or linking algorithm.
pub trait AlgorithmStrategy: Send + Sync {
    /// Display name, unique within the strategy's category.
    fn name(&self) -> &str;

    /// Description shown in catalogue listings. May contain HTML markup.
    fn description(&self) -> &str {
        ""
    }

    /// Full parameter surface with default values.
    fn default_settings(&self, ctx: &DefaultsContext) -> SettingsMap;

    /// Blocking run. Should poll `ctx.cancel` between units of work.
    fn run(&self, ctx: &ExecutionContext, settings: &SettingsMap) -> Result<(), StrategyError>;
}

/// Handle to a registered strategy. Cheap to clone.
#[derive(Clone)]
pub struct AlgorithmVariant {
    category: AlgorithmCategory,
    strategy: Arc<dyn AlgorithmStrategy>,
}

impl AlgorithmVariant {
    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    pub fn category(&self) -> AlgorithmCategory {
        self.category
    }

    pub fn description(&self) -> &str {
        self.strategy.description()
    }

    pub(crate) fn strategy(&self) -> &dyn AlgorithmStrategy {
        self.strategy.as_ref()
    }
}

impl PartialEq for AlgorithmVariant {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.name() == other.name()
    }
}

impl fmt::Debug for AlgorithmVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmVariant")
            .field("category", &self.category)
            .field("name", &self.name())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NotFound {
        category: AlgorithmCategory,
        name: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NotFound { category, name } => {
                write!(f, "Unknown {category}: {name}.")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Default)]
pub struct AlgorithmRegistry {
    detectors: Vec<AlgorithmVariant>,
    linkers: Vec<AlgorithmVariant>,
    context: DefaultsContext,
}

impl AlgorithmRegistry {
    /// Empty registry.
    pub fn new(context: DefaultsContext) -> Self {
        Self {
            detectors: Vec::new(),
            linkers: Vec::new(),
            context,
        }
    }

    /// Registry seeded with the built-in detectors and linkers.
    pub fn with_builtin_variants(context: DefaultsContext) -> Self {
        let mut registry = Self::new(context);
        crate::registries::builtin::register_builtin_variants(&mut registry);
        registry
    }

    pub fn context(&self) -> DefaultsContext {
        self.context
    }

    /// Append a strategy. A strategy whose name is already registered in the
    /// category replaces the earlier one in place.
    pub fn register(&mut self, category: AlgorithmCategory, strategy: Arc<dyn AlgorithmStrategy>) {
        let variant = AlgorithmVariant { category, strategy };
        let variants = self.variants_mut(category);
        match variants
            .iter()
            .position(|existing| existing.name() == variant.name())
        {
            Some(index) => variants[index] = variant,
            None => variants.push(variant),
        }
    }

    pub fn list_variants(&self, category: AlgorithmCategory) -> &[AlgorithmVariant] {
        match category {
            AlgorithmCategory::Detector => &self.detectors,
            AlgorithmCategory::Linker => &self.linkers,
        }
    }

    /// Canonical default settings for `variant`.
    pub fn defaults_for(&self, variant: &AlgorithmVariant) -> SettingsMap {
        variant.strategy().default_settings(&self.context)
    }

    pub fn resolve(&self, category: AlgorithmCategory, name: &str) -> Result<AlgorithmVariant, RegistryError> {
        self.list_variants(category)
            .iter()
            .find(|variant| variant.name() == name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                category,
                name: name.to_string(),
            })
    }

    /// Catalogue listing: index, name, description and parameter table of
    /// every variant in `category`.
    pub fn describe(&self, category: AlgorithmCategory) -> String {
        let mut out = format!("Available {}:\n", category.plural());
        for (index, variant) in self.list_variants(category).iter().enumerate() {
            let header = format!("\n{index:>2}: '{}'\n", variant.name());
            out.push_str(&header);
            out.push_str(&dashes(header.chars().count()));
            out.push('\n');

            out.push_str("Description:\n");
            let wrapped = wrap(&strip_html(variant.description()), 70, "\n    ");
            let _ = writeln!(out, "    {wrapped}");

            out.push_str("Parameters:\n");
            push_param_row(&mut out, "Name", "Type", "Default value");
            push_param_row(&mut out, &dashes(4), &dashes(4), &dashes(13));
            for (key, value) in self.defaults_for(variant).iter() {
                let (type_label, default) = match value {
                    Some(value) => (value.kind().label(), value.to_string()),
                    None => (fallback_param_type(key), "null".to_string()),
                };
                push_param_row(&mut out, key, type_label, &default);
            }
        }
        out
    }

    fn variants_mut(&mut self, category: AlgorithmCategory) -> &mut Vec<AlgorithmVariant> {
        match category {
            AlgorithmCategory::Detector => &mut self.detectors,
            AlgorithmCategory::Linker => &mut self.linkers,
        }
    }
}

fn push_param_row(out: &mut String, name: &str, type_label: &str, default: &str) {
    let _ = writeln!(out, "    {name:<40} {type_label:<20} {default:<20}");
}

/// Type label for parameters whose default is null.
fn fallback_param_type(key: &str) -> &'static str {
    match key {
        "ADD_BEHAVIOR" | "DETECTION_TYPE" => "String",
        "ROI" => "Interval",
        _ => "?",
    }
}

fn dashes(len: usize) -> String {
    "-".repeat(len)
}

/// Replace every run of HTML tags (and whitespace between them) with one
/// space. An unterminated `<` is kept as text.
pub(crate) fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + len + 1..];
        loop {
            let trimmed = rest.trim_start();
            if trimmed.starts_with('<')
                && let Some(next_len) = trimmed.find('>')
            {
                rest = &trimmed[next_len + 1..];
                continue;
            }
            break;
        }
        out.push(' ');
    }
    out.push_str(rest);
    out
}

/// Greedy word wrap. Words longer than `width` stay on their own line.
pub(crate) fn wrap(text: &str, width: usize, newline: &str) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len > 0 && line_len + 1 + word_len > width {
            out.push_str(newline);
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(word);
        line_len += word_len;
    }
    out
}

/// Defaults helper for strategies: `insert_unchecked` for every pair.
pub fn settings_from<const N: usize>(entries: [(&str, Option<SettingValue>); N]) -> SettingsMap {
    let mut map = SettingsMap::new();
    for (key, value) in entries {
        map.insert_unchecked(key, value);
    }
    map
}
