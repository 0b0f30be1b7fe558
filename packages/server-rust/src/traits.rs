use async_trait::async_trait;
use tsid_core::{IdentityRecord, PeerEndpoint};

use crate::access::ResolveError;

/// Maps an overlay connection endpoint to the identity that owns it right now.
///
/// Overlay addresses are not stable identities, so implementations must hit
/// the lookup service on every call and never cache across requests.
/// Implementations: `LocalApiResolver` (tailscaled LocalAPI), in-memory fakes (tests).
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the owner of `endpoint`.
    ///
    /// Dropping the returned future must abort any in-flight lookup.
    async fn resolve(&self, endpoint: &PeerEndpoint) -> Result<IdentityRecord, ResolveError>;
}
