use std::fmt;

use axum::http::StatusCode;
use tsid_core::IdentityRecord;

/// Structured failure of a single identity lookup.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The lookup service has no identity bound to the endpoint.
    #[error("peer not found")]
    PeerUnknown,
    /// The lookup service could not be reached or answered unexpectedly.
    #[error("lookup service unavailable: {0}")]
    ServiceUnavailable(#[source] anyhow::Error),
}

/// Infrastructure failure: the request is terminated without an access decision.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("malformed remote address {raw:?}: {reason}")]
    MalformedAddress { raw: String, reason: String },
    #[error("identity lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
}

/// Why a well-formed request was refused.
///
/// Tracked internally only; both reasons produce the same HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Address lies outside every overlay range.
    NotOverlayMember,
    /// Address is in range but no active identity owns the endpoint.
    PeerUnknown,
}

impl DenyReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotOverlayMember => "not_overlay_member",
            Self::PeerUnknown => "peer_unknown",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one access decision. Exactly one variant holds per request.
#[derive(Debug)]
pub enum AccessOutcome {
    Allow(IdentityRecord),
    Deny(DenyReason),
    Error(AccessError),
}

impl AccessOutcome {
    /// HTTP status this outcome maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Allow(_) => StatusCode::OK,
            Self::Deny(_) => StatusCode::FORBIDDEN,
            Self::Error(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for logs and the decision counter.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow(_) => "allow",
            Self::Deny(_) => "deny",
            Self::Error(_) => "error",
        }
    }

    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}
