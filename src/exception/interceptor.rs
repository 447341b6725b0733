use crate::config::HandlerConfig;
use crate::error::Result;
use crate::exception::classifier::ErrorClassifier;
use crate::exception::hook::Classify;
use crate::exception::response::{BufferedResponse, ResponseProgress, ResponseSink};
use crate::failure::{Failure, RaisedFailure};
use crate::interceptor::{Interceptor, InterceptorLayer, InterceptorMiddleware, InterceptorResult, Next};
use crate::record::{ErrorKind, ErrorRecord};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, Uri, header},
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tower::Layer;

/// Trace fragments that belong to this crate or to trace capture itself.
/// Frames containing any of them are always left out of reported traces.
pub const OWN_FRAMES: [&str; 2] = [concat!(env!("CARGO_CRATE_NAME"), "::"), "std::backtrace::"];

/// Converts failures of the downstream request processing into JSON error
/// documents.
///
/// For each failing request the interceptor classifies the failure, logs it
/// when the record's behavior asks for it, and replaces the response with
/// the serialized record when the behavior asks for that. A failure raised
/// after the response started going out is logged and propagated unchanged.
///
/// ```rust,ignore
/// let exceptions = ExceptionInterceptor::new(HandlerConfig::from_env())
///     .with_classifier(ClassificationTable::standard());
///
/// let app = ServiceBuilder::new()
///     .layer(ExceptionLayer::new(exceptions))
///     .service(router);
/// ```
#[derive(Clone)]
pub struct ExceptionInterceptor {
    classifier: ErrorClassifier,
}

impl ExceptionInterceptor {
    pub fn new(config: HandlerConfig) -> Self {
        let config = OWN_FRAMES
            .into_iter()
            .fold(config, |config, own| config.omit_source(own));
        Self {
            classifier: ErrorClassifier::new(Arc::new(config)),
        }
    }

    /// Replaces the classification hook (identity by default).
    pub fn with_classifier(mut self, hook: impl Classify) -> Self {
        self.classifier = self.classifier.with_hook(hook);
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        self.classifier.config()
    }

    /// Handles one failure against `sink`.
    ///
    /// Returns the failure back when the response already started; the caller
    /// must propagate it. Every other outcome, including a failed write, is
    /// absorbed here.
    pub async fn handle_failure(
        &self,
        failure: Failure,
        requested_url: &str,
        sink: &mut (dyn ResponseSink + '_),
    ) -> std::result::Result<(), Failure> {
        if sink.has_started() {
            tracing::error!(
                exception_type = %failure.kind(),
                exception_message = %failure.message(),
                requested_url,
                "Unhandled exception occurred of type {} with message: \"{}\". Response started - no JSON handler is launched!",
                failure.kind(),
                failure.message(),
            );
            return Err(failure);
        }

        let record = self.classifier.classify(&failure, Some(sink.status()), requested_url);

        if record.error_behavior.should_log() {
            log_failure(&record, &failure);
        }

        if record.error_behavior.should_respond() {
            let status = response_status(&record);
            if let Err(err) = write_record(sink, &record, status).await {
                tracing::error!(
                    error = %err,
                    requested_url,
                    "Failed to write error response for exception of type {}",
                    failure.kind(),
                );
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Interceptor for ExceptionInterceptor {
    async fn intercept(&self, mut request: Request<Body>, next: Next) -> InterceptorResult {
        let progress = ResponseProgress::new();
        request.extensions_mut().insert(progress.clone());
        let requested_url = raw_target(request.uri());

        let failure = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(Ok(mut response)) => {
                match response.extensions_mut().remove::<RaisedFailure>().and_then(|slot| slot.take()) {
                    Some(failure) => {
                        // a status set around the parked failure is its status at failure time
                        if response.status() != RaisedFailure::PLACEHOLDER_STATUS {
                            progress.set_status(response.status());
                        }
                        failure
                    }
                    None => return Ok(response),
                }
            }
            Ok(Err(error)) => Failure::from_boxed(error),
            Err(payload) => Failure::from_panic(payload),
        };

        let mut sink = BufferedResponse::from_progress(&progress);
        match self.handle_failure(failure, &requested_url, &mut sink).await {
            Ok(()) => Ok(sink.into_response()),
            Err(failure) => Err(failure.into_reraised()),
        }
    }
}

/// Tower layer installing an [`ExceptionInterceptor`] around a service.
///
/// Failures the interceptor propagates come out as the service error; put
/// `axum::error_handling::HandleErrorLayer` outside it when the stack must be
/// infallible.
#[derive(Clone)]
pub struct ExceptionLayer {
    inner: InterceptorLayer,
}

impl ExceptionLayer {
    pub fn new(interceptor: ExceptionInterceptor) -> Self {
        Self {
            inner: InterceptorLayer::single(interceptor),
        }
    }
}

impl<S> Layer<S> for ExceptionLayer {
    type Service = InterceptorMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        self.inner.layer(inner)
    }
}

/// Path and query as sent by the client.
fn raw_target(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|target| target.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Status written for a record: its own when it denotes an error, otherwise
/// 400 for validation failures and 500 for everything else.
pub fn response_status(record: &ErrorRecord) -> StatusCode {
    let code = if record.status > 399 {
        record.status
    } else if record.error_type == ErrorKind::DataValidationError {
        400
    } else {
        500
    };
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn log_failure(record: &ErrorRecord, failure: &Failure) {
    if record.error_type == ErrorKind::DataValidationError {
        tracing::error!(
            exception_type = %failure.kind(),
            exception_message = %failure.message(),
            requested_url = %record.requested_url,
            validation_errors = record.validation_errors.len(),
            "Data validation exception occurred with message: \"{}\".",
            failure.message(),
        );
    } else {
        tracing::error!(
            exception_type = %failure.kind(),
            exception_message = %failure.message(),
            requested_url = %record.requested_url,
            error_type = %record.error_type,
            "Unhandled exception occurred of type {} with message: \"{}\".",
            failure.kind(),
            failure.message(),
        );
    }
}

async fn write_record(
    sink: &mut (dyn ResponseSink + '_),
    record: &ErrorRecord,
    status: StatusCode,
) -> Result<()> {
    let body = serde_json::to_vec_pretty(record)?;

    sink.set_status(status);
    let headers = sink.headers_mut();
    headers.clear();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("-1"));
    headers.remove(header::ETAG);

    sink.truncate();
    sink.write(Bytes::from(body)).await
}
