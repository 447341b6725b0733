//! # json-exception-handler
//!
//! Tower/axum middleware that turns failures raised while serving a request
//! into a uniform JSON error document.
//!
//! ## Features
//!
//! - **One document shape**: title, failure kind, coarse error type, status,
//!   requested URL, validation entries, nested causes and an optional trace
//! - **Pluggable classification**: map your own error types to error types,
//!   statuses and behaviors through a [`Classify`](exception::Classify) hook
//! - **Panics included**: a panicking handler is reported like any other failure
//! - **Trace filtering**: frames from configured sources are left out
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use json_exception_handler::prelude::*;
//! use tower::ServiceBuilder;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("order {0} does not exist")]
//! struct OrderMissing(u64);
//!
//! async fn order(Path(id): Path<u64>) -> Result<String, Failure> {
//!     Err(OrderMissing(id).into())
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let exceptions = ExceptionInterceptor::new(HandlerConfig::from_env())
//!         .with_classifier(ClassificationTable::standard().on::<OrderMissing, _>(|record, _| {
//!             record.with_kind(ErrorKind::RequestError).with_status(404)
//!         }));
//!
//!     let app = ServiceBuilder::new()
//!         .layer(ExceptionLayer::new(exceptions))
//!         .service(Router::<()>::new().route("/orders/{id}", get(order)));
//!
//!     # let _ = app;
//!     // Serve `app`...
//! }
//! ```

pub mod config;
pub mod error;
pub mod exception;
pub mod failure;
pub mod interceptor;
pub mod record;

// Re-export core types
pub use config::HandlerConfig;
pub use error::{BoxError, HandlerError, Result};
pub use exception::{
    ClassificationTable, Classify, ExceptionInterceptor, ExceptionLayer, ResponseProgress,
};
pub use failure::{Cancelled, Failure, NotImplemented};
pub use record::{CauseNode, ErrorBehavior, ErrorKind, ErrorRecord, ValidationFailure};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use json_exception_handler::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::HandlerConfig;
    pub use crate::error::{BoxError, HandlerError};
    pub use crate::exception::{
        BufferedResponse, ClassificationTable, Classify, ErrorClassifier, ExceptionInterceptor,
        ExceptionLayer, Identity, ResponseProgress, ResponseSink,
    };
    pub use crate::failure::{Cancelled, Failure, NotImplemented};
    pub use crate::interceptor::{Interceptor, InterceptorLayer, InterceptorResult, Next};
    pub use crate::record::{
        CauseNode, ErrorBehavior, ErrorKind, ErrorRecord, ValidationFailure,
    };
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
    };
    pub use std::sync::Arc;
}
