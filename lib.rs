/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Scripting core for a cell-tracking model.
//!
//! Two protocols share one `Model`: batch mutation of the current selection
//! (`model::transaction`) and detector/linker configuration with settings
//! carried across variant switches (`registries`).

pub mod config;
pub mod execution;
pub mod model;
pub mod registries;
pub mod session;

pub use config::{ConfigError, TrackshellConfig};
pub use execution::{CancelToken, ExecutionContext, ExecutionResult, StrategyError};
pub use model::transaction::{DeletionReport, SelectionTransaction, TaggingReport};
pub use model::{GraphListener, Model, ModelData, ModelSummary};
pub use session::TrackingSession;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
