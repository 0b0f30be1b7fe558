//! `tsid` Core — overlay address classification, identity records, and request vars.
//!
//! Everything here is pure: no I/O, no async. The server crate builds the
//! lookup client and request filter on top of these types.

pub mod overlay;
pub mod types;
pub mod vars;
pub mod whois;

pub use overlay::{AddressClassifier, IpPrefix};
pub use types::{IdentityRecord, MembershipClass, PeerEndpoint};
pub use vars::{RequestVars, VAR_EMAIL, VAR_GROUPS, VAR_MEMBERSHIP, VAR_NAME};
pub use whois::WhoIsResponse;
