//! Raised failures as seen by the exception interceptor.
//!
//! A [`Failure`] wraps whatever went wrong while producing a response: an
//! error returned by a handler, an error surfaced by the inner service, or a
//! caught panic. It remembers the name of the concrete failure kind and the
//! call trace captured when it was raised.

mod kinds;

pub use kinds::{Cancelled, NotImplemented, Panicked};

use crate::error::BoxError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Kind reported when nothing better can be derived from an erased error.
pub const FALLBACK_KIND: &str = "Error";

/// Kind reported for failures caught from a panic.
pub const PANIC_KIND: &str = "Panic";

static CAPTURE_TRACES: AtomicBool = AtomicBool::new(false);

/// Turns on backtrace capture for failures created from now on.
///
/// Capture stays off until something needs traces; an [`ErrorClassifier`]
/// configured to show them calls this. Once on, it stays on for the process.
///
/// [`ErrorClassifier`]: crate::exception::ErrorClassifier
pub fn enable_trace_capture() {
    CAPTURE_TRACES.store(true, Ordering::Relaxed);
}

pub fn trace_capture_enabled() -> bool {
    CAPTURE_TRACES.load(Ordering::Relaxed)
}

/// Call trace attached to a failure.
pub enum Trace {
    /// Captured in-process when the failure was created.
    Captured(Backtrace),
    /// Rendered elsewhere (another runtime, a panic hook) in the std backtrace format.
    Rendered(String),
    Absent,
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trace::Captured(backtrace) => write!(f, "Captured({:?})", backtrace.status()),
            Trace::Rendered(text) => write!(f, "Rendered({} bytes)", text.len()),
            Trace::Absent => f.write_str("Absent"),
        }
    }
}

/// A failure raised while producing a response.
///
/// Any `std::error::Error` converts into a `Failure` through `?`, so axum
/// handlers can return `Result<T, Failure>`:
///
/// ```rust,ignore
/// async fn load(Path(id): Path<u64>) -> Result<Json<Order>, Failure> {
///     let order = repository.find(id).await?;
///     Ok(Json(order))
/// }
/// ```
///
/// `Failure` does not implement `std::error::Error` itself; the blanket
/// `From` conversion requires that.
pub struct Failure {
    error: BoxError,
    kind: Cow<'static, str>,
    message: String,
    trace: Trace,
    // payload is Send only
    panic: Option<Mutex<Box<dyn Any + Send>>>,
}

impl Failure {
    /// Wraps a typed error. The kind is the error's type name without its
    /// module path or generic arguments.
    ///
    /// The backtrace is captured here, where the failure is raised, when
    /// trace capture is on (see [`enable_trace_capture`]).
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let kind = short_type_name(std::any::type_name::<E>());
        let trace = if trace_capture_enabled() {
            Trace::Captured(Backtrace::force_capture())
        } else {
            Trace::Absent
        };
        Self::from_parts(Box::new(error), Cow::Borrowed(kind), trace)
    }

    /// Wraps an already type-erased error, deriving the kind from its `Debug`
    /// rendering. For an enum that is the variant name, so the same error
    /// reports a different kind than through [`Failure::new`].
    ///
    /// Erased errors are caught away from where they were raised and carry
    /// no trace.
    pub fn from_boxed(error: BoxError) -> Self {
        let kind = kind_of(error.as_ref());
        Self::from_parts(error, Cow::Owned(kind), Trace::Absent)
    }

    /// Wraps a panic payload caught with `catch_unwind`. No trace: the
    /// unwinding stack is gone by the time the payload is caught.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = panic_message(payload.as_ref());
        let mut failure = Self::from_parts(
            Box::new(Panicked { message }),
            Cow::Borrowed(PANIC_KIND),
            Trace::Absent,
        );
        failure.panic = Some(Mutex::new(payload));
        failure
    }

    fn from_parts(error: BoxError, kind: Cow<'static, str>, trace: Trace) -> Self {
        let message = error.to_string();
        Self {
            error,
            kind,
            message,
            trace,
            panic: None,
        }
    }

    /// Overrides the reported kind name.
    pub fn with_kind(mut self, kind: impl Into<Cow<'static, str>>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Replaces the captured trace with one rendered elsewhere.
    pub fn with_trace_text(mut self, trace: impl Into<String>) -> Self {
        self.trace = Trace::Rendered(trace.into());
        self
    }

    pub fn without_trace(mut self) -> Self {
        self.trace = Trace::Absent;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped error.
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// The wrapped error's underlying cause, the head of the cause chain.
    pub fn cause(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.error.is::<T>()
    }

    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.error.downcast_ref::<T>()
    }

    pub fn is_panic(&self) -> bool {
        self.panic.is_some()
    }

    /// Hands back the original error for propagation to an outer layer.
    ///
    /// A failure caught from a panic resumes unwinding with the original
    /// payload instead of returning.
    pub fn into_reraised(self) -> BoxError {
        if let Some(payload) = self.panic {
            let payload = payload.into_inner().unwrap_or_else(PoisonError::into_inner);
            std::panic::resume_unwind(payload);
        }
        self.error
    }
}

impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("error", &self.error)
            .field("trace", &self.trace)
            .finish()
    }
}

/// Parks the failure in the response extensions for the exception
/// interceptor to pick up. Without the interceptor the client sees a bare
/// placeholder 500.
impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut response = RaisedFailure::PLACEHOLDER_STATUS.into_response();
        response.extensions_mut().insert(RaisedFailure::new(self));
        response
    }
}

/// Response extension carrying a failure returned by a handler.
#[derive(Clone)]
pub struct RaisedFailure(Arc<Mutex<Option<Failure>>>);

impl RaisedFailure {
    /// Status of the response a bare `Failure` turns into. Any other status
    /// was set around the failure, e.g. `Err((StatusCode::NOT_FOUND, failure))`.
    pub const PLACEHOLDER_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

    pub fn new(failure: Failure) -> Self {
        Self(Arc::new(Mutex::new(Some(failure))))
    }

    /// Takes the failure out; later calls return `None`.
    pub fn take(&self) -> Option<Failure> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Best-effort kind name of an erased error: the leading identifier of its
/// `Debug` rendering, which for derived impls is the type or variant name.
pub fn kind_of(error: &(dyn StdError + 'static)) -> String {
    if error.is::<std::io::Error>() {
        return "IoError".to_string();
    }

    let rendered = format!("{error:?}");
    let name: String = rendered
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        FALLBACK_KIND.to_string()
    } else {
        name
    }
}

fn short_type_name(name: &'static str) -> &'static str {
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("Testable problem")]
    struct ApplicationError {
        #[source]
        cause: Option<ArgumentError>,
    }

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct ArgumentError(String);

    #[derive(Debug, Error)]
    enum StorageError {
        #[error("row {0} is locked")]
        Locked(u32),
    }

    #[test]
    fn test_typed_failure_uses_short_type_name() {
        let failure = Failure::new(ApplicationError { cause: None });
        assert_eq!(failure.kind(), "ApplicationError");
        assert_eq!(failure.message(), "Testable problem");
        assert_eq!(failure.to_string(), "Testable problem");
        assert!(failure.is::<ApplicationError>());
        assert!(failure.cause().is_none());
        assert!(!failure.is_panic());
    }

    #[test]
    fn test_short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name("my_app::errors::ArgumentError"), "ArgumentError");
        assert_eq!(short_type_name("core::result::Result<u8, alloc::string::String>"), "Result");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_cause_is_the_wrapped_errors_source() {
        let failure = Failure::new(ApplicationError {
            cause: Some(ArgumentError("Goin' deeper".to_string())),
        });
        let cause = failure.cause().unwrap();
        assert_eq!(cause.to_string(), "Goin' deeper");
        assert_eq!(kind_of(cause), "ArgumentError");
    }

    #[test]
    fn test_caught_failures_carry_no_trace() {
        enable_trace_capture();
        let failure = Failure::from_boxed(Box::new(StorageError::Locked(7)));
        assert!(matches!(failure.trace(), Trace::Absent));

        let failure = Failure::from_panic(Box::new("boom"));
        assert!(matches!(failure.trace(), Trace::Absent));
    }

    #[test]
    fn test_kind_depends_on_how_the_error_arrived() {
        assert_eq!(Failure::new(StorageError::Locked(7)).kind(), "StorageError");
        assert_eq!(Failure::from_boxed(Box::new(StorageError::Locked(7))).kind(), "Locked");
    }

    #[test]
    fn test_boxed_failure_derives_kind_from_debug() {
        let failure = Failure::from_boxed(Box::new(StorageError::Locked(7)));
        assert_eq!(failure.kind(), "Locked");
        assert_eq!(failure.message(), "row 7 is locked");
        assert!(failure.downcast_ref::<StorageError>().is_some());

        let failure = Failure::from_boxed(BoxError::from("plain text"));
        assert_eq!(failure.kind(), FALLBACK_KIND);
        assert_eq!(failure.message(), "plain text");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(Failure::from_boxed(Box::new(io)).kind(), "IoError");
    }

    #[test]
    fn test_question_mark_converts_errors() {
        fn parse(input: &str) -> Result<u32, Failure> {
            Ok(input.parse::<u32>()?)
        }

        let failure = parse("twelve").unwrap_err();
        assert_eq!(failure.kind(), "ParseIntError");
    }

    #[test]
    fn test_panic_payloads() {
        let failure = Failure::from_panic(Box::new("boom"));
        assert_eq!(failure.kind(), PANIC_KIND);
        assert_eq!(failure.message(), "boom");
        assert!(failure.is_panic());
        assert!(failure.is::<Panicked>());

        let failure = Failure::from_panic(Box::new(String::from("formatted boom")));
        assert_eq!(failure.message(), "formatted boom");

        let failure = Failure::from_panic(Box::new(42_u8));
        assert_eq!(failure.message(), "panic with a non-string payload");
    }

    #[test]
    fn test_reraising_a_panic_resumes_unwinding() {
        let failure = Failure::from_panic(Box::new("original payload"));
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            failure.into_reraised();
        }))
        .unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"original payload"));
    }

    #[test]
    fn test_reraising_an_error_returns_it_unchanged() {
        let failure = Failure::new(ArgumentError("Goin' deeper".to_string()));
        let error = failure.into_reraised();
        assert!(error.is::<ArgumentError>());
    }

    #[test]
    fn test_trace_builders() {
        enable_trace_capture();
        let failure = Failure::new(ArgumentError("x".to_string()));
        assert!(matches!(failure.trace(), Trace::Captured(_)));

        let failure = failure.with_trace_text("   0: main\n             at src/main.rs:1:1");
        assert!(matches!(failure.trace(), Trace::Rendered(_)));

        let failure = failure.without_trace().with_kind("Renamed");
        assert!(matches!(failure.trace(), Trace::Absent));
        assert_eq!(failure.kind(), "Renamed");
    }

    #[test]
    fn test_into_response_parks_the_failure() {
        let response = Failure::new(ArgumentError("parked".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let slot = response.extensions().get::<RaisedFailure>().unwrap().clone();
        assert_eq!(slot.take().unwrap().message(), "parked");
        assert!(slot.take().is_none());
    }
}
