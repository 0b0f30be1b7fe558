//! Tower adapter that runs the access decision in front of an HTTP service.
//!
//! On allow the identity is published into request extensions and the
//! request continues; on deny or error the inner service is never called.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use axum::response::{IntoResponse, Response};
use http::{Request, StatusCode};
use tower::{Layer, Service};
use tsid_core::AddressClassifier;

use super::config::TsidConfig;
use super::decision::AccessDecision;
use super::outcome::AccessOutcome;
use super::propagate::IdentityPropagator;
use super::resolver::LocalApiResolver;

/// Name the filter is registered under.
pub const FILTER_NAME: &str = "tsid";

/// Raw remote address supplied by a transport, e.g. `"100.64.0.5:51820"`.
///
/// Takes precedence over axum's `ConnectInfo` when both are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

// ---------------------------------------------------------------------------
// TsidLayer
// ---------------------------------------------------------------------------

/// Tower layer that gates requests on overlay identity.
#[derive(Clone)]
pub struct TsidLayer {
    decision: AccessDecision,
    propagator: IdentityPropagator,
}

impl TsidLayer {
    #[must_use]
    pub fn new(decision: AccessDecision, propagator: IdentityPropagator) -> Self {
        Self {
            decision,
            propagator,
        }
    }

    /// Layer backed by the LocalAPI resolver and the Tailscale ranges.
    #[must_use]
    pub fn from_config(config: &TsidConfig) -> Self {
        let resolver = Arc::new(LocalApiResolver::new(config.local_api.clone()));
        Self::new(
            AccessDecision::new(AddressClassifier::default(), resolver, config.mode),
            IdentityPropagator::new(config.publish_groups),
        )
    }
}

impl<S> Layer<S> for TsidLayer {
    type Service = TsidService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TsidService {
            inner,
            decision: self.decision.clone(),
            propagator: self.propagator,
        }
    }
}

// ---------------------------------------------------------------------------
// TsidService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TsidService<S> {
    inner: S,
    decision: AccessDecision,
    propagator: IdentityPropagator,
}

impl<S, B> Service<Request<B>> for TsidService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Keep the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let decision = self.decision.clone();
        let propagator = self.propagator;

        Box::pin(async move {
            let raw = remote_addr(&req).unwrap_or_default();
            match decision.decide(&raw).await {
                AccessOutcome::Allow(record) => {
                    propagator.publish(req.extensions_mut(), &record);
                    inner.call(req).await
                }
                AccessOutcome::Deny(_) => Ok((StatusCode::FORBIDDEN, "Forbidden").into_response()),
                AccessOutcome::Error(_) => Ok((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                )
                    .into_response()),
            }
        })
    }
}

fn remote_addr<B>(req: &Request<B>) -> Option<String> {
    let ext = req.extensions();
    ext.get::<RemoteAddr>()
        .map(|r| r.0.clone())
        .or_else(|| ext.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.to_string()))
}
