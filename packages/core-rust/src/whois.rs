//! Wire model of the `tailscaled` LocalAPI `whois` response.
//!
//! Only the fields needed to build an [`IdentityRecord`](crate::IdentityRecord)
//! are modelled; everything else in the payload is ignored on decode.

use serde::{Deserialize, Serialize};

/// Body of `GET /localapi/v0/whois?addr=<ip:port>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WhoIsResponse {
    /// Node that owns the queried endpoint.
    #[serde(default)]
    pub node: WhoIsNode,
    /// Profile of the user that owns the node.
    pub user_profile: UserProfile,
}

impl WhoIsResponse {
    /// Convenience constructor for a resolved user on a node.
    #[must_use]
    pub fn new(display_name: &str, login_name: &str, sharee_node: bool) -> Self {
        Self {
            node: WhoIsNode {
                name: String::new(),
                hostinfo: Some(Hostinfo { sharee_node }),
            },
            user_profile: UserProfile {
                login_name: login_name.to_string(),
                display_name: display_name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WhoIsNode {
    /// MagicDNS name of the node.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostinfo: Option<Hostinfo>,
}

impl WhoIsNode {
    /// Whether the node is only visible because it was shared into the tailnet.
    #[must_use]
    pub fn is_sharee(&self) -> bool {
        self.hostinfo.as_ref().is_some_and(|h| h.sharee_node)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hostinfo {
    #[serde(default)]
    pub sharee_node: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserProfile {
    /// Login identifier, usually an email address.
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub display_name: String,
}
