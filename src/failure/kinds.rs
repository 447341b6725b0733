use thiserror::Error;

/// The operation was cancelled before it could finish.
///
/// Classified as [`ErrorKind::CancelledOperation`](crate::record::ErrorKind::CancelledOperation)
/// by [`ClassificationTable::standard`](crate::exception::ClassificationTable::standard).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Cancelled {
    pub message: String,
}

impl Cancelled {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for Cancelled {
    fn default() -> Self {
        Self::new("The operation was cancelled.")
    }
}

/// The invoked functionality does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NotImplemented {
    pub message: String,
}

impl NotImplemented {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for NotImplemented {
    fn default() -> Self {
        Self::new("The method or operation is not implemented.")
    }
}

/// A panic caught while the inner service was producing a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Panicked {
    pub message: String,
}
