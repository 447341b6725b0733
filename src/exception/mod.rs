//! Failure classification and JSON error responses.

pub mod cause;
pub mod classifier;
pub mod hook;
pub mod interceptor;
pub mod response;
pub mod trace;

pub use classifier::{ErrorClassifier, TRACE_ERROR_PREFIX};
pub use hook::{ClassificationTable, Classify, Identity};
pub use interceptor::{ExceptionInterceptor, ExceptionLayer, response_status};
pub use response::{BufferedResponse, ResponseProgress, ResponseSink};
pub use trace::TraceError;
