//! Response-writing primitives used by the exception interceptor.

use crate::error::Result;
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::Response,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// The response a failure is reported into.
#[async_trait]
pub trait ResponseSink: Send {
    /// True once any part of the response went out; it can no longer be replaced.
    fn has_started(&self) -> bool;

    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Discards buffered body output. Returns false when the sink cannot.
    fn truncate(&mut self) -> bool;

    /// Writes `body`. Called at most once per failure.
    async fn write(&mut self, body: Bytes) -> Result<()>;
}

/// Progress of the response being produced for the current request.
///
/// The exception interceptor puts one into the request extensions. Handlers
/// that stream output or pick a status before failing report it here:
///
/// ```rust,ignore
/// async fn export(progress: ResponseProgress) -> Result<Body, Failure> {
///     progress.set_status(StatusCode::CONFLICT);
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ResponseProgress {
    state: Arc<ProgressState>,
}

#[derive(Debug)]
struct ProgressState {
    started: AtomicBool,
    status: AtomicU16,
}

impl Default for ResponseProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseProgress {
    /// Not started, status 200.
    pub fn new() -> Self {
        Self {
            state: Arc::new(ProgressState {
                started: AtomicBool::new(false),
                status: AtomicU16::new(StatusCode::OK.as_u16()),
            }),
        }
    }

    pub fn has_started(&self) -> bool {
        self.state.started.load(Ordering::Acquire)
    }

    pub fn mark_started(&self) {
        self.state.started.store(true, Ordering::Release);
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.state.status.load(Ordering::Acquire)).unwrap_or(StatusCode::OK)
    }

    pub fn set_status(&self, status: StatusCode) {
        self.state.status.store(status.as_u16(), Ordering::Release);
    }
}

/// Yields the interceptor's progress handle, or a detached one when the
/// route is not behind the exception interceptor.
impl<S> FromRequestParts<S> for ResponseProgress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<ResponseProgress>().cloned().unwrap_or_default())
    }
}

/// In-memory sink that becomes an axum [`Response`].
#[derive(Debug)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    started: bool,
}

impl BufferedResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
            started: false,
        }
    }

    /// Seeds status and started flag from the request's progress handle.
    pub fn from_progress(progress: &ResponseProgress) -> Self {
        let mut response = Self::new(progress.status());
        response.started = progress.has_started();
        response
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    fn has_started(&self) -> bool {
        self.started
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn truncate(&mut self) -> bool {
        self.body.clear();
        true
    }

    async fn write(&mut self, body: Bytes) -> Result<()> {
        self.started = true;
        self.body.extend_from_slice(&body);
        Ok(())
    }
}
