mod exit;
mod logging;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clrelay::naming::{LocationConfig, NameResolver, NamingError};
use clrelay::relay::{bootstrap, FetchExecutor, RelayState};
use clrelay::schema::{DocumentFetcher, FetcherConfig, SchemaCompiler, DEFAULT_IPFS_GATEWAY};
use clrelay::server;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::exit::{
    io_error, naming_error, relay_error, schema_error, CliError, CliResult, INTERNAL, SUCCESS,
};
use crate::logging::{init_logging, LogFormat, LogLevel};

/// Bound on each JSON-RPC round trip during startup.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "clrelay", version, about = "Contract-enforcing HTTP fetch relay")]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Request schema URL (used with --rcpt-url).
    #[arg(long, env = "REQ_URL", value_name = "URL")]
    req_url: Option<String>,

    /// Receipt schema URL (used with --req-url).
    #[arg(long, env = "RCPT_URL", value_name = "URL")]
    rcpt_url: Option<String>,

    /// ENS name whose text records point at the schemas.
    #[arg(long, env = "ENS_NAME", value_name = "NAME")]
    ens_name: Option<String>,

    /// Ethereum JSON-RPC endpoint for the ENS lookup.
    #[arg(long, env = "RPC_URL", value_name = "URL")]
    rpc_url: Option<String>,

    /// Gateway prefix for ipfs:// schema documents.
    #[arg(long, env = "IPFS_GATEWAY", value_name = "URL", default_value = DEFAULT_IPFS_GATEWAY)]
    ipfs_gateway: String,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

impl Cli {
    fn locations(&self) -> LocationConfig {
        LocationConfig {
            request_schema_url: self.req_url.clone(),
            receipt_schema_url: self.rcpt_url.clone(),
            ens_name: self.ens_name.clone(),
            rpc_url: self.rpc_url.clone(),
        }
    }

    fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            ipfs_gateway: self.ipfs_gateway.clone(),
            ..FetcherConfig::default()
        }
    }

    fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!(code = err.code, "{err}");
            std::process::exit(err.code);
        }
    }
}

fn run(cli: Cli) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    runtime.block_on(serve(cli))
}

async fn serve(cli: Cli) -> CliResult<i32> {
    let executor = FetchExecutor::new().map_err(|err| relay_error("client setup failed", err))?;
    let state = Arc::new(RelayState::new(executor));

    let addr = cli.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| io_error(&format!("bind {addr} failed"), err))?;
    info!(%addr, "relay listening");

    // Health answers while schemas are still loading.
    let mut server = tokio::spawn(server::serve(listener, state.clone(), shutdown_signal()));

    let fetcher = DocumentFetcher::new(cli.fetcher_config())
        .map_err(|err| schema_error("client setup failed", err))?;
    let compiler = SchemaCompiler::new(Arc::new(fetcher));
    let rpc_client = reqwest::Client::builder()
        .timeout(RPC_TIMEOUT)
        .build()
        .map_err(|err| naming_error("client setup failed", NamingError::Client(err)))?;
    let resolver = NameResolver::new(rpc_client);
    let locations = cli.locations();

    tokio::select! {
        loaded = bootstrap(&locations, &resolver, &compiler, &state) => {
            if let Err(err) = loaded {
                server.abort();
                return Err(relay_error("schema load failed", err));
            }
        }
        finished = &mut server => return server_exit(finished),
    }

    server_exit(server.await)
}

fn server_exit(finished: Result<std::io::Result<()>, JoinError>) -> CliResult<i32> {
    match finished {
        Ok(Ok(())) => {
            info!("relay stopped");
            Ok(SUCCESS)
        }
        Ok(Err(err)) => Err(io_error("server failed", err)),
        Err(err) => Err(CliError::new(INTERNAL, format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
}
