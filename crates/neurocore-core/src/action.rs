//! Optimization action data model.
//!
//! An `OptimizationAction` pairs display metadata with an `Operation`: the
//! zero-argument unit of work that performs (or simulates) a system change and
//! reports an `OptimizationResult`.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::Result;

// ---------------------------------------------------------------------------
// OptimizationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl OptimizationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
            data: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// The execution function bound to an action.
///
/// `Ok(result)` means the operation ran to completion, whatever
/// `result.success` says. `Err` means it could not produce a result.
pub trait Operation: Send + Sync {
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>>;
}

/// Adapts an async closure into an `Operation`.
pub struct FnOperation<F>(F);

impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<OptimizationResult>> + Send + 'static,
{
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>> {
        Box::pin((self.0)())
    }
}

pub fn operation_fn<F, Fut>(f: F) -> Arc<dyn Operation>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OptimizationResult>> + Send + 'static,
{
    Arc::new(FnOperation(f))
}

// ---------------------------------------------------------------------------
// OptimizationAction
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct OptimizationAction {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Advisory only; never enforced against the actual runtime.
    pub estimated_duration_secs: u32,
    pub warning: Option<String>,
    pub operation: Arc<dyn Operation>,
}

impl OptimizationAction {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        estimated_duration_secs: u32,
        operation: Arc<dyn Operation>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: category.into(),
            estimated_duration_secs,
            warning: None,
            operation,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Serializable metadata view, without the bound operation.
    pub fn info(&self) -> ActionInfo {
        ActionInfo {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            estimated_duration_secs: self.estimated_duration_secs,
            warning: self.warning.clone(),
        }
    }
}

impl fmt::Debug for OptimizationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizationAction")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("estimated_duration_secs", &self.estimated_duration_secs)
            .field("warning", &self.warning)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub estimated_duration_secs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
