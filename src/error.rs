use thiserror::Error;

pub type Result<T> = std::result::Result<T, HandlerError>;

/// Type-erased error travelling through the interceptor chain.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Failed to serialize error document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write error response: {message}")]
    Write { message: String },

    #[error("Unknown error kind discriminant: {0}")]
    UnknownErrorKind(u8),
}

impl HandlerError {
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }
}
