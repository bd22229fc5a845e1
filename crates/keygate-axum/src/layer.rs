//! Tower middleware that authenticates requests for one policy.
//!
//! The [`AuthLayer`] extracts the credentials its resolver needs, resolves
//! the principal and stores the resulting
//! [`AuthenticatedToken`](keygate_auth_core::AuthenticatedToken) in the
//! request extensions. A failed resolution short-circuits with an
//! [`AuthRejection`] response.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use keygate_auth_core::{AuthPolicy, Resolver, TokenStrategy};
use keygate_db::{PrincipalRepository, RevocationStore};
use tower::{Layer, Service};

use crate::error::AuthRejection;
use crate::transport::Transport;

/// Tower layer that authenticates requests.
pub struct AuthLayer<U: PrincipalRepository + ?Sized, S: RevocationStore + ?Sized> {
    strategy: Arc<TokenStrategy<U, S>>,
    transport: Arc<dyn Transport>,
    resolver: Resolver,
}

impl<U: PrincipalRepository + ?Sized, S: RevocationStore + ?Sized> AuthLayer<U, S> {
    /// Create a layer enforcing `policy`.
    #[must_use]
    pub fn new(
        strategy: Arc<TokenStrategy<U, S>>,
        transport: Arc<dyn Transport>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            strategy,
            transport,
            resolver: Resolver::new(policy),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

impl<U: PrincipalRepository + ?Sized, S: RevocationStore + ?Sized> Clone for AuthLayer<U, S> {
    fn clone(&self) -> Self {
        Self {
            strategy: Arc::clone(&self.strategy),
            transport: Arc::clone(&self.transport),
            resolver: self.resolver,
        }
    }
}

impl<Inner, U, S> Layer<Inner> for AuthLayer<U, S>
where
    U: PrincipalRepository + ?Sized,
    S: RevocationStore + ?Sized,
{
    type Service = AuthMiddleware<Inner, U, S>;

    fn layer(&self, inner: Inner) -> Self::Service {
        AuthMiddleware {
            inner,
            strategy: Arc::clone(&self.strategy),
            transport: Arc::clone(&self.transport),
            resolver: self.resolver,
        }
    }
}

/// The authentication service produced by [`AuthLayer`].
pub struct AuthMiddleware<Inner, U: PrincipalRepository + ?Sized, S: RevocationStore + ?Sized> {
    inner: Inner,
    strategy: Arc<TokenStrategy<U, S>>,
    transport: Arc<dyn Transport>,
    resolver: Resolver,
}

impl<Inner: Clone, U, S> Clone for AuthMiddleware<Inner, U, S>
where
    U: PrincipalRepository + ?Sized,
    S: RevocationStore + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            strategy: Arc::clone(&self.strategy),
            transport: Arc::clone(&self.transport),
            resolver: self.resolver,
        }
    }
}

impl<Inner, U, S> Service<Request<Body>> for AuthMiddleware<Inner, U, S>
where
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
    U: PrincipalRepository + ?Sized + 'static,
    S: RevocationStore + ?Sized + 'static,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = BoxFuture<'static, Result<Response, Inner::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let credentials = self.transport.extract(req.headers(), self.resolver.fields());
        let strategy = Arc::clone(&self.strategy);
        let resolver = self.resolver;

        // The clone may not be ready; keep the one that was polled
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match resolver.resolve(&strategy, &credentials).await {
                Ok(Some(authenticated)) => {
                    req.extensions_mut().insert(authenticated);
                }
                Ok(None) => {}
                Err(err) => return Ok(AuthRejection::from(err).into_response()),
            }

            inner.call(req).await
        })
    }
}
