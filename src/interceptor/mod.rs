use crate::error::BoxError;
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;

pub mod layer;

pub use layer::{InterceptorLayer, InterceptorMiddleware};

/// Standard return type for interceptors.
pub type InterceptorResult = Result<Response, InterceptorError>;

/// A type-erased error for interceptors.
pub type InterceptorError = BoxError;

type NextFuture = Pin<Box<dyn Future<Output = InterceptorResult> + Send>>;

/// The rest of the chain, ending in the wrapped service.
pub struct Next {
    run: Box<dyn FnOnce(Request<Body>) -> NextFuture + Send>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> NextFuture + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Passes the request on. Consumes `self`: the chain runs at most once.
    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// Wraps request processing.
///
/// An interceptor sees the request before the rest of the chain and the
/// outcome after it, and may replace either.
///
/// ```rust,ignore
/// struct Timing;
///
/// #[async_trait]
/// impl Interceptor for Timing {
///     async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
///         let start = Instant::now();
///         let response = next.run(request).await?;
///         tracing::info!("request took {:?}", start.elapsed());
///         Ok(response)
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
