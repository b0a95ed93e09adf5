/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Outcome and cooperative cancellation for strategy runs.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::model::Model;

/// Result of running a detector or linker. Never a panic, never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    Canceled(String),
    Failed(String),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Success => f.write_str("success"),
            ExecutionResult::Canceled(reason) => write!(f, "Canceled: {reason}"),
            ExecutionResult::Failed(message) => write!(f, "Failed: {message}"),
        }
    }
}

/// Error a strategy reports from `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    Canceled(String),
    Failed(String),
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyError::Canceled(reason) => write!(f, "canceled: {reason}"),
            StrategyError::Failed(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for StrategyError {}

impl From<StrategyError> for ExecutionResult {
    fn from(err: StrategyError) -> Self {
        match err {
            StrategyError::Canceled(reason) => ExecutionResult::Canceled(reason),
            StrategyError::Failed(message) => ExecutionResult::Failed(message),
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    requested: AtomicBool,
    reason: Mutex<Option<String>>,
}

/// Shared cancellation flag. Clones observe the same request.
///
/// Strategies poll `check` between units of work; nothing is interrupted
/// from the outside.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The first reason wins.
    pub fn cancel(&self, reason: &str) {
        let mut stored = self.state.reason.lock();
        if stored.is_none() {
            *stored = Some(reason.to_string());
        }
        self.state.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.state.reason.lock().clone()
    }

    /// `Err(Canceled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), StrategyError> {
        if !self.is_canceled() {
            return Ok(());
        }
        Err(StrategyError::Canceled(self.reason().unwrap_or_default()))
    }
}

/// What a strategy run gets to work with.
#[derive(Clone)]
pub struct ExecutionContext {
    pub model: Arc<Model>,
    pub cancel: CancelToken,
}

impl ExecutionContext {
    pub fn new(model: Arc<Model>, cancel: CancelToken) -> Self {
        Self { model, cancel }
    }
}
