//! Configuration for the identity filter.

use std::path::PathBuf;

use tracing::debug;

/// Base URL used for LocalAPI requests. Over the unix socket the host is
/// never resolved; it only fills the `Host` header, as tailscaled expects.
pub const DEFAULT_LOCAL_API_URL: &str = "http://local-tailscaled.sock";

/// Socket tailscaled listens on for LocalAPI requests on Linux.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/tailscale/tailscaled.sock";

/// How the decision reaches the lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Check the overlay ranges locally, then resolve members only.
    #[default]
    ClassifyThenResolve,
    /// Skip the range check and rely on the lookup service's "not found".
    ///
    /// Costs a lookup for every request, including public traffic.
    ResolveOnly,
}

/// Connection settings for the tailscaled LocalAPI.
#[derive(Debug, Clone)]
pub struct LocalApiConfig {
    /// Base URL the `/localapi/v0/...` paths are appended to.
    pub base_url: String,
    /// LocalAPI password, required when tailscaled listens on TCP (macOS, Windows).
    pub password: Option<String>,
    /// Unix socket to dial instead of TCP. `None` connects to `base_url` directly.
    pub socket_path: Option<PathBuf>,
}

impl LocalApiConfig {
    /// LocalAPI reached over TCP at `base_url`, e.g. the macOS app's listener.
    #[must_use]
    pub fn tcp(base_url: impl Into<String>, password: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            password,
            socket_path: None,
        }
    }

    /// LocalAPI reached over the unix socket at `path`.
    #[must_use]
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: DEFAULT_LOCAL_API_URL.to_string(),
            password: None,
            socket_path: Some(path.into()),
        }
    }
}

impl Default for LocalApiConfig {
    /// The tailscaled socket on unix platforms; elsewhere a TCP LocalAPI
    /// must be configured explicitly.
    fn default() -> Self {
        if cfg!(unix) {
            Self::unix(DEFAULT_SOCKET_PATH)
        } else {
            Self::tcp(DEFAULT_LOCAL_API_URL, None)
        }
    }
}

/// Top-level filter configuration.
#[derive(Debug, Clone, Default)]
pub struct TsidConfig {
    pub local_api: LocalApiConfig,
    pub mode: ResolutionMode,
    /// Also publish `tailscale.groups` alongside the three identity vars.
    pub publish_groups: bool,
}

impl TsidConfig {
    /// Builds a configuration from a declarative directive body.
    ///
    /// The filter takes no parameters, so every token is accepted and ignored.
    #[must_use]
    pub fn from_directive(body: &str) -> Self {
        if !body.trim().is_empty() {
            debug!(body = body, "ignoring tsid directive arguments");
        }
        Self::default()
    }
}
