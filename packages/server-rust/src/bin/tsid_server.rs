//! Standalone `tsid` server: identity-gated `whoami` endpoint.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tsid_server::access::{LocalApiConfig, ResolutionMode, TsidConfig, TsidLayer};
use tsid_server::network::{NetworkConfig, NetworkModule};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser)]
#[command(name = "tsid-server")]
#[command(about = "Serve HTTP only to Tailscale peers and identify them")]
#[command(version)]
struct Cli {
    /// Bind address
    #[arg(long, env = "TSID_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port
    #[arg(short, long, env = "TSID_PORT", default_value = "8080")]
    port: u16,

    /// Request timeout in seconds, identity lookup included
    #[arg(long, env = "TSID_REQUEST_TIMEOUT", default_value = "30")]
    request_timeout: u64,

    /// tailscaled LocalAPI socket
    #[arg(long, env = "TSID_LOCALAPI_SOCKET", default_value = tsid_server::access::config::DEFAULT_SOCKET_PATH)]
    localapi_socket: PathBuf,

    /// Reach the LocalAPI over TCP at this URL instead of the socket (macOS, Windows)
    #[arg(long, env = "TSID_LOCALAPI_URL")]
    localapi_url: Option<String>,

    /// LocalAPI password (TCP LocalAPI only)
    #[arg(long, env = "TSID_LOCALAPI_PASSWORD", hide_env_values = true)]
    localapi_password: Option<String>,

    /// Skip the local overlay range check and ask the LocalAPI for every peer
    #[arg(long, env = "TSID_RESOLVE_ONLY")]
    resolve_only: bool,

    /// Also publish `tailscale.groups`
    #[arg(long, env = "TSID_PUBLISH_GROUPS")]
    publish_groups: bool,

    /// Log output format
    #[arg(long, env = "TSID_LOG_FORMAT", value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

impl Cli {
    fn tsid_config(&self) -> TsidConfig {
        TsidConfig {
            local_api: match &self.localapi_url {
                Some(url) => LocalApiConfig::tcp(url.clone(), self.localapi_password.clone()),
                None => LocalApiConfig::unix(self.localapi_socket.clone()),
            },
            mode: if self.resolve_only {
                ResolutionMode::ResolveOnly
            } else {
                ResolutionMode::ClassifyThenResolve
            },
            publish_groups: self.publish_groups,
        }
    }

    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout),
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let tsid_config = cli.tsid_config();
    info!(
        localapi = %tsid_config.local_api.base_url,
        socket = ?tsid_config.local_api.socket_path,
        mode = ?tsid_config.mode,
        "tsid filter configured"
    );

    let mut module = NetworkModule::new(cli.network_config(), TsidLayer::from_config(&tsid_config));
    let port = module.start().await?;
    info!("tsid-server listening on {}:{}", cli.host, port);

    module.serve(shutdown_signal()).await
}
