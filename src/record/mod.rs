//! The outward-facing error document and its parts.

mod behavior;
mod kind;
mod validation;

pub use behavior::ErrorBehavior;
pub use kind::ErrorKind;
pub use validation::ValidationFailure;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status used whenever no explicit error status (> 399) is known.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// Error document written as the response body for a failed request.
///
/// Serialized with camelCase keys. `stackTrace` is omitted entirely when no
/// trace was attached, `innerException` is `null` when the failure had no
/// cause, and `errorBehavior` never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Human-readable message, the failure's message unless a hook replaces it.
    pub title: String,
    /// Name of the concrete failure kind. Typed failures report the type
    /// name; erased ones the leading identifier of their `Debug` output,
    /// which for an enum is the variant name.
    pub exception_type: String,
    pub error_type: ErrorKind,
    /// HTTP status to report. Values of 399 and below are replaced when writing.
    pub status: u16,
    /// Raw target (path and query) of the failing request.
    #[serde(default)]
    pub requested_url: String,
    #[serde(default)]
    pub validation_errors: Vec<ValidationFailure>,
    #[serde(default)]
    pub inner_exception: Option<CauseNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Vec<String>>,
    #[serde(skip)]
    pub error_behavior: ErrorBehavior,
}

impl ErrorRecord {
    /// A server error record with status 500 and the default behavior.
    pub fn new(title: impl Into<String>, exception_type: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            exception_type: exception_type.into(),
            error_type: ErrorKind::ServerError,
            status: DEFAULT_ERROR_STATUS,
            requested_url: String::new(),
            validation_errors: Vec::new(),
            inner_exception: None,
            stack_trace: None,
            error_behavior: ErrorBehavior::default(),
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.error_type = kind;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_behavior(mut self, behavior: ErrorBehavior) -> Self {
        self.error_behavior = behavior;
        self
    }

    pub fn with_validation_failure(mut self, failure: ValidationFailure) -> Self {
        self.validation_errors.push(failure);
        self
    }

    pub fn with_validation_failures(
        mut self,
        failures: impl IntoIterator<Item = ValidationFailure>,
    ) -> Self {
        self.validation_errors.extend(failures);
        self
    }
}

/// One level of a failure's cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseNode {
    pub title: String,
    pub exception_type: String,
    #[serde(default)]
    pub inner_exception: Option<Box<CauseNode>>,
}

impl CauseNode {
    pub fn new(title: impl Into<String>, exception_type: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            exception_type: exception_type.into(),
            inner_exception: None,
        }
    }

    /// Number of nodes in the chain starting at `self`.
    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// Walks this node and every node below it, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &CauseNode> {
        std::iter::successors(Some(self), |node| node.inner_exception.as_deref())
    }
}

impl fmt::Display for CauseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.exception_type, self.title)
    }
}
