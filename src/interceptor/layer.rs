use crate::error::BoxError;
use crate::interceptor::{Interceptor, Next};
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer running a chain of [`Interceptor`]s around the inner service.
///
/// The first interceptor is the outermost one.
#[derive(Clone)]
pub struct InterceptorLayer {
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl InterceptorLayer {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: Arc::new(interceptors),
        }
    }

    pub fn single(interceptor: impl Interceptor) -> Self {
        let interceptor: Arc<dyn Interceptor> = Arc::new(interceptor);
        Self::new(vec![interceptor])
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorMiddleware {
            inner,
            interceptors: Arc::clone(&self.interceptors),
        }
    }
}

#[derive(Clone)]
pub struct InterceptorMiddleware<S> {
    inner: S,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl<S> Service<Request<Body>> for InterceptorMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // the ready service goes into the future, its clone stays behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let interceptors = Arc::clone(&self.interceptors);

        Box::pin(async move {
            let mut chain = Next::new(move |req| {
                Box::pin(async move { inner.call(req).await.map_err(Into::into) })
            });

            for interceptor in interceptors.iter().rev() {
                let interceptor = Arc::clone(interceptor);
                let next = chain;
                chain = Next::new(move |req| {
                    Box::pin(async move { interceptor.intercept(req, next).await })
                });
            }

            chain.run(request).await
        })
    }
}
