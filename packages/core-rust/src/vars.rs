//! Request-scoped key/value attributes.
//!
//! Earlier stages may already have stored values here; identity
//! publication overwrites only its own names and leaves the rest alone.

use std::collections::BTreeMap;

use serde::Serialize;

/// Display name of the resolved user.
pub const VAR_NAME: &str = "tailscale.name";
/// Login identifier of the resolved user (usually an email).
pub const VAR_EMAIL: &str = "tailscale.email";
/// Membership classification, `Regular` or `Guest`.
pub const VAR_MEMBERSHIP: &str = "tailscale.membership";
/// Semicolon-joined group list, only published when enabled.
pub const VAR_GROUPS: &str = "tailscale.groups";

/// Attribute store attached to a single request.
///
/// Uses `BTreeMap` so serialized output (e.g. for templating) is ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestVars {
    vars: BTreeMap<String, String>,
}

impl RequestVars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any previous value.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copies every entry of `other` into `self`, overwriting on collision.
    pub fn merge(&mut self, other: RequestVars) {
        self.vars.extend(other.vars);
    }

    /// Resolved display name, if identity was published.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get(VAR_NAME)
    }

    /// Resolved login identifier, if identity was published.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.get(VAR_EMAIL)
    }

    /// Resolved membership classification, if identity was published.
    #[must_use]
    pub fn membership(&self) -> Option<&str> {
        self.get(VAR_MEMBERSHIP)
    }
}
