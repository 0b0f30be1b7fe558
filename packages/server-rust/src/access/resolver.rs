//! `tailscaled` LocalAPI identity resolver.
//!
//! Queries `GET /localapi/v0/whois?addr=<ip:port>` once per call. A 404 is
//! the daemon's "no such peer" answer and maps to [`ResolveError::PeerUnknown`];
//! every other failure is an infrastructure fault. On unix the daemon is
//! reached over its socket; TCP with a password covers macOS and Windows.

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::OnceCell;
use tracing::debug;
use tsid_core::{IdentityRecord, PeerEndpoint, WhoIsResponse};

use super::config::LocalApiConfig;
use super::outcome::ResolveError;
use crate::traits::IdentityResolver;

const WHOIS_PATH: &str = "/localapi/v0/whois";

/// Resolver backed by the local tailscaled daemon.
///
/// The HTTP client is built on first use and shared by every request
/// afterwards. `OnceCell` runs the builder exactly once even when the first
/// requests race.
#[derive(Debug)]
pub struct LocalApiResolver {
    config: LocalApiConfig,
    client: OnceCell<reqwest::Client>,
}

impl LocalApiResolver {
    #[must_use]
    pub fn new(config: LocalApiConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&reqwest::Client, ResolveError> {
        self.client
            .get_or_try_init(|| async {
                debug!(
                    base_url = %self.config.base_url,
                    socket = ?self.config.socket_path,
                    "building LocalAPI client"
                );
                let builder = reqwest::Client::builder().no_proxy();
                #[cfg(unix)]
                let builder = match &self.config.socket_path {
                    Some(path) => builder.unix_socket(path.as_path()),
                    None => builder,
                };
                #[cfg(not(unix))]
                if self.config.socket_path.is_some() {
                    return Err(ResolveError::ServiceUnavailable(anyhow!(
                        "unix socket LocalAPI is not available on this platform"
                    )));
                }
                builder
                    .build()
                    .map_err(|e| ResolveError::ServiceUnavailable(e.into()))
            })
            .await
    }

    fn whois_url(&self) -> String {
        format!("{}{WHOIS_PATH}", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl IdentityResolver for LocalApiResolver {
    async fn resolve(&self, endpoint: &PeerEndpoint) -> Result<IdentityRecord, ResolveError> {
        let client = self.client().await?;

        let mut request = client
            .get(self.whois_url())
            .query(&[("addr", endpoint.to_string())])
            .header("Sec-Tailscale", "localapi");
        if let Some(password) = &self.config.password {
            request = request.basic_auth("", Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::ServiceUnavailable(e.into()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ResolveError::PeerUnknown),
            status if status.is_success() => {
                let whois: WhoIsResponse = response
                    .json()
                    .await
                    .map_err(|e| ResolveError::ServiceUnavailable(e.into()))?;
                Ok(IdentityRecord::from(whois))
            }
            status => Err(ResolveError::ServiceUnavailable(anyhow!(
                "LocalAPI whois returned {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::net::TcpListener;
    use tokio::sync::Notify;
    use tsid_core::MembershipClass;

    use super::*;

    #[derive(Clone, Default)]
    struct Fixture {
        calls: Arc<AtomicUsize>,
        /// Signalled when a pending handler is dropped before responding.
        abandoned: Arc<Notify>,
    }

    /// Notifies the fixture when the handler holding it is dropped.
    struct AbandonGuard(Arc<Notify>);

    impl Drop for AbandonGuard {
        fn drop(&mut self) {
            self.0.notify_one();
        }
    }

    /// Emulates tailscaled's whois endpoint for a handful of fixed endpoints.
    async fn whois(
        State(fixture): State<Fixture>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        fixture.calls.fetch_add(1, Ordering::SeqCst);
        if headers.get("sec-tailscale").and_then(|v| v.to_str().ok()) != Some("localapi") {
            return StatusCode::FORBIDDEN.into_response();
        }
        match params.get("addr").map(String::as_str) {
            Some("100.64.0.5:51820") => {
                Json(WhoIsResponse::new("Alice", "alice@example.com", true)).into_response()
            }
            Some("[fd7a:115c:a1e0::7]:443") => {
                Json(WhoIsResponse::new("Bob", "bob@example.com", false)).into_response()
            }
            Some("100.64.0.10:1") => (StatusCode::OK, "not json").into_response(),
            Some("100.64.0.11:1") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Some("100.64.0.12:1") => {
                let guard = AbandonGuard(Arc::clone(&fixture.abandoned));
                tokio::time::sleep(Duration::from_secs(3600)).await;
                std::mem::forget(guard);
                StatusCode::OK.into_response()
            }
            _ => (StatusCode::NOT_FOUND, "no match for IP:port").into_response(),
        }
    }

    fn fixture_app(fixture: &Fixture) -> Router {
        Router::new()
            .route(WHOIS_PATH, get(whois))
            .with_state(fixture.clone())
    }

    async fn spawn_fixture() -> (String, Fixture) {
        let fixture = Fixture::default();
        let app = fixture_app(&fixture);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), fixture)
    }

    fn resolver(base_url: String) -> LocalApiResolver {
        LocalApiResolver::new(LocalApiConfig::tcp(base_url, None))
    }

    fn endpoint(raw: &str) -> PeerEndpoint {
        PeerEndpoint::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn resolves_sharee_node_as_guest() {
        let (url, _) = spawn_fixture().await;
        let record = resolver(url)
            .resolve(&endpoint("100.64.0.5:51820"))
            .await
            .unwrap();
        assert_eq!(record.display_name(), "Alice");
        assert_eq!(record.login_name(), "alice@example.com");
        assert_eq!(record.membership(), MembershipClass::Guest);
    }

    #[tokio::test]
    async fn resolves_ipv6_endpoint_as_regular() {
        let (url, _) = spawn_fixture().await;
        let record = resolver(url)
            .resolve(&endpoint("[fd7a:115c:a1e0::7]:443"))
            .await
            .unwrap();
        assert_eq!(record.login_name(), "bob@example.com");
        assert_eq!(record.membership(), MembershipClass::Regular);
    }

    #[tokio::test]
    async fn not_found_is_peer_unknown() {
        let (url, _) = spawn_fixture().await;
        let err = resolver(url)
            .resolve(&endpoint("100.64.0.9:9999"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::PeerUnknown));
    }

    #[tokio::test]
    async fn server_error_is_service_unavailable() {
        let (url, _) = spawn_fixture().await;
        let err = resolver(url)
            .resolve(&endpoint("100.64.0.11:1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn undecodable_body_is_service_unavailable() {
        let (url, _) = spawn_fixture().await;
        let err = resolver(url)
            .resolve(&endpoint("100.64.0.10:1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_daemon_is_service_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = resolver(format!("http://{addr}"))
            .resolve(&endpoint("100.64.0.5:51820"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_tolerated() {
        let (url, _) = spawn_fixture().await;
        let record = resolver(format!("{url}/"))
            .resolve(&endpoint("100.64.0.5:51820"))
            .await
            .unwrap();
        assert_eq!(record.display_name(), "Alice");
    }

    #[tokio::test]
    async fn every_call_hits_the_daemon() {
        let (url, fixture) = spawn_fixture().await;
        let resolver = resolver(url);
        let ep = endpoint("100.64.0.5:51820");
        resolver.resolve(&ep).await.unwrap();
        resolver.resolve(&ep).await.unwrap();
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_first_use_shares_one_client() {
        let (url, fixture) = spawn_fixture().await;
        let resolver = Arc::new(resolver(url));
        assert!(!resolver.client.initialized());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.resolve(&endpoint("100.64.0.5:51820")).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert!(resolver.client.initialized());
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn dropping_the_future_abandons_the_lookup() {
        let (url, fixture) = spawn_fixture().await;
        let resolver = resolver(url);
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            resolver.resolve(&endpoint("100.64.0.12:1")),
        )
        .await;
        assert!(result.is_err(), "lookup should still be pending at the deadline");

        // The dropped request closes its connection, so the daemon side
        // stops working on it instead of answering a request that is gone.
        let abandoned =
            tokio::time::timeout(Duration::from_secs(5), fixture.abandoned.notified()).await;
        assert!(abandoned.is_ok(), "daemon handler was never dropped");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolves_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tailscaled.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();
        let fixture = Fixture::default();
        let app = fixture_app(&fixture);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let resolver = LocalApiResolver::new(LocalApiConfig::unix(&path));
        let record = resolver
            .resolve(&endpoint("100.64.0.5:51820"))
            .await
            .unwrap();
        assert_eq!(record.login_name(), "alice@example.com");
        assert_eq!(record.membership(), MembershipClass::Guest);

        let err = resolver
            .resolve(&endpoint("100.64.0.9:9999"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::PeerUnknown));
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_socket_is_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = LocalApiResolver::new(LocalApiConfig::unix(dir.path().join("absent.sock")));
        let err = resolver
            .resolve(&endpoint("100.64.0.5:51820"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ServiceUnavailable(_)));
    }
}
