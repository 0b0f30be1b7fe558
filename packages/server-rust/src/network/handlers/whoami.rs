//! Identity echo endpoint.

use axum::{Extension, Json};
use tsid_core::RequestVars;

/// Returns the identity vars the filter published for this request.
///
/// Only reachable behind the filter, so the extension is always present.
pub async fn whoami_handler(Extension(vars): Extension<RequestVars>) -> Json<RequestVars> {
    Json(vars)
}
