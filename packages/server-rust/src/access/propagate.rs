//! Publishes a resolved identity into the request's attribute store.

use http::Extensions;
use tsid_core::{IdentityRecord, RequestVars, VAR_EMAIL, VAR_GROUPS, VAR_MEMBERSHIP, VAR_NAME};

/// Writes identity attributes into [`RequestVars`] carried in request extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPropagator {
    publish_groups: bool,
}

impl IdentityPropagator {
    #[must_use]
    pub fn new(publish_groups: bool) -> Self {
        Self { publish_groups }
    }

    /// The attributes `record` publishes, without touching any request.
    #[must_use]
    pub fn attributes(&self, record: &IdentityRecord) -> RequestVars {
        let mut vars = RequestVars::new();
        vars.put(VAR_NAME, record.display_name());
        vars.put(VAR_EMAIL, record.login_name());
        vars.put(VAR_MEMBERSHIP, record.membership().as_str());
        if self.publish_groups {
            vars.put(VAR_GROUPS, record.groups().join(";"));
        }
        vars
    }

    /// Publishes `record` into `extensions`.
    ///
    /// Attributes are staged first and applied in one step. Existing
    /// `RequestVars` from earlier stages are kept; identity names overwrite.
    pub fn publish(&self, extensions: &mut Extensions, record: &IdentityRecord) {
        let staged = self.attributes(record);
        match extensions.get_mut::<RequestVars>() {
            Some(vars) => vars.merge(staged),
            None => {
                extensions.insert(staged);
            }
        }
    }
}
