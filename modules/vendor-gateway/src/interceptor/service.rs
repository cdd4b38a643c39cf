use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Request;
use tower::Service;
use vendor_http::BoxError;

use super::{GatewayResponse, Interceptor, PreparedCall};
use crate::error::GatewayError;

/// Tower adapter that lets an [`Interceptor`] sit at the bottom of an outbound
/// `http::Request` stack.
///
/// Each call drains the request body into a [`PreparedCall`] and runs it to a
/// terminal outcome. Always ready.
pub struct InterceptorService<I> {
    inner: Arc<I>,
}

impl<I> InterceptorService<I> {
    #[must_use]
    pub fn new(interceptor: Arc<I>) -> Self {
        Self { inner: interceptor }
    }
}

impl<I> Clone for InterceptorService<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, B> Service<Request<B>> for InterceptorService<I>
where
    I: Interceptor + 'static,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = GatewayResponse;
    type Error = GatewayError;
    type Future = Pin<Box<dyn Future<Output = Result<GatewayResponse, GatewayError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let call = PreparedCall::from_request(request).await?;
            inner.execute(call).await
        })
    }
}
