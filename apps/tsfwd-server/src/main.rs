//! tsfwd server: listener bootstrap around the origin resolver.
//!
//! Deploy this behind a reverse proxy that sets `X-Forwarded-For` itself;
//! the adapter trusts that header verbatim.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use origin_resolver::api::rest;
use origin_resolver::{
    LocalApiClient, OriginPolicy, OriginResolver, OriginResolverConfig, PolicyMode,
};

#[derive(Debug, Parser)]
#[command(name = "tsfwd-server", version, about = "Tailscale forward-auth adapter")]
struct Args {
    /// Path to the tailscaled UNIX socket
    #[arg(long, default_value = "/var/run/tailscale/tailscaled.sock")]
    socket: PathBuf,

    /// CIDR prefix consumed by the origin policy
    #[arg(long, default_value = "127.0.0.1/32")]
    cidr: ipnet::IpNet,

    /// Origin policy mode
    #[arg(long, value_enum, default_value_t = Mode::AllowList)]
    mode: Mode,

    /// Bind address to listen for requests
    #[arg(long, default_value = "127.0.0.1:8245")]
    listen: SocketAddr,

    /// Whois lookup timeout in seconds
    #[arg(long, default_value_t = 5)]
    whois_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Mode {
    /// Gate on the socket origin, resolve the forwarded-for address
    AllowList,
    /// Pass forwarded-for addresses inside the prefix as anonymous
    SkipOrigin,
}

impl From<Mode> for PolicyMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::AllowList => Self::AllowList,
            Mode::SkipOrigin => Self::SkipOrigin,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = OriginResolverConfig {
        tailscaled_socket: args.socket,
        mode: args.mode.into(),
        prefix: args.cidr,
        whois_timeout: Duration::from_secs(args.whois_timeout),
    };

    let whois = Arc::new(LocalApiClient::from_config(&config));
    let resolver = Arc::new(OriginResolver::new(
        OriginPolicy::from_config(&config),
        whois,
    ));
    let app = rest::router(resolver);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("bind {}", args.listen))?;
    tracing::info!(
        listen = %args.listen,
        socket = %config.tailscaled_socket.display(),
        prefix = %config.prefix,
        "tsfwd listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server terminated")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
    tracing::info!("shutting down");
}
