//! Access decision: classify, resolve, decide.
//!
//! Runs the cheap local range check first and only consults the lookup
//! service for overlay addresses. Every failure becomes a value; nothing is
//! retried and nothing propagates past [`AccessDecision::decide`].

use std::sync::Arc;

use tracing::{debug, error, info_span, warn, Instrument};
use tsid_core::{AddressClassifier, PeerEndpoint};

use super::config::ResolutionMode;
use super::outcome::{AccessError, AccessOutcome, DenyReason, ResolveError};
use crate::traits::IdentityResolver;

/// Name of the counter recording every decision, labelled by outcome and reason.
pub const DECISIONS_METRIC: &str = "tsid_decisions_total";

/// Orchestrates [`AddressClassifier`] and an [`IdentityResolver`].
///
/// Cheap to clone; clones share the resolver.
#[derive(Clone)]
pub struct AccessDecision {
    classifier: Arc<AddressClassifier>,
    resolver: Arc<dyn IdentityResolver>,
    mode: ResolutionMode,
}

impl AccessDecision {
    #[must_use]
    pub fn new(
        classifier: AddressClassifier,
        resolver: Arc<dyn IdentityResolver>,
        mode: ResolutionMode,
    ) -> Self {
        Self {
            classifier: Arc::new(classifier),
            resolver,
            mode,
        }
    }

    /// Decide on a request given the raw remote address from the transport.
    pub async fn decide(&self, raw_remote_addr: &str) -> AccessOutcome {
        let span = info_span!("tsid", remote_addr = raw_remote_addr);
        let outcome = self.decide_inner(raw_remote_addr).instrument(span).await;
        record(&outcome);
        outcome
    }

    async fn decide_inner(&self, raw: &str) -> AccessOutcome {
        let endpoint = match PeerEndpoint::parse(raw) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!(error = %e, "cannot parse remote address");
                return AccessOutcome::Error(AccessError::MalformedAddress {
                    raw: raw.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        self.decide_endpoint(&endpoint).await
    }

    async fn decide_endpoint(&self, endpoint: &PeerEndpoint) -> AccessOutcome {
        if self.mode == ResolutionMode::ClassifyThenResolve
            && !self.classifier.is_overlay_member(endpoint.address)
        {
            warn!(peer = %endpoint, reason = %DenyReason::NotOverlayMember, "access denied");
            return AccessOutcome::Deny(DenyReason::NotOverlayMember);
        }

        match self.resolver.resolve(endpoint).await {
            Ok(record) => {
                debug!(
                    peer = %endpoint,
                    login = record.login_name(),
                    membership = %record.membership(),
                    "access allowed"
                );
                AccessOutcome::Allow(record)
            }
            Err(ResolveError::PeerUnknown) => {
                warn!(peer = %endpoint, reason = %DenyReason::PeerUnknown, "access denied");
                AccessOutcome::Deny(DenyReason::PeerUnknown)
            }
            Err(ResolveError::ServiceUnavailable(cause)) => {
                error!(peer = %endpoint, error = %cause, "identity lookup failed");
                AccessOutcome::Error(AccessError::Lookup(cause))
            }
        }
    }
}

fn record(outcome: &AccessOutcome) {
    let reason = match outcome {
        AccessOutcome::Allow(_) => "none",
        AccessOutcome::Deny(reason) => reason.as_str(),
        AccessOutcome::Error(AccessError::MalformedAddress { .. }) => "malformed_address",
        AccessOutcome::Error(AccessError::Lookup(_)) => "lookup_failed",
    };
    metrics::counter!(DECISIONS_METRIC, "outcome" => outcome.label(), "reason" => reason)
        .increment(1);
}
