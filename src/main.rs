//! Demo daemon: wires the bridge to a trivial in-process server manager.
//!
//! Runs the preview-server task for the given workspaces, binds real
//! loopback listeners when a terminal requests a server start, and reports
//! the resolved addresses back through the coordinator. Useful for exercising
//! the full open → connected → started loop without an editor host.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use preview_bridge::config::BridgeConfig;
use preview_bridge::connection::ConnectionManager;
use preview_bridge::resolver::LoopbackResolver;
use preview_bridge::task::definition::ServerStartedStatus;
use preview_bridge::task::{LocalTaskHost, ServerTaskProvider};
use preview_bridge::telemetry::{self, HttpSink, TelemetrySender};
use preview_bridge::workspace::{WorkspaceKey, WorkspaceRegistry};

#[derive(Parser)]
#[command(
    name = "preview-bridge",
    about = "Dev preview server bridge — demo runner",
    version
)]
struct Args {
    /// Path to config.toml
    #[arg(long, env = "PREVIEW_BRIDGE_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Workspace folders to serve (repeatable). None = global context.
    #[arg(long = "workspace")]
    workspaces: Vec<PathBuf>,

    /// Run the verbose task variant (per-request logging).
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, env = "PREVIEW_BRIDGE_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BridgeConfig::load_or_default(&args.config);

    let telemetry = match (config.telemetry.enabled, config.telemetry.endpoint.as_deref()) {
        (true, Some(endpoint)) => telemetry::spawn(Arc::new(HttpSink::new(endpoint))),
        _ => TelemetrySender::disabled(),
    };

    let workspaces = Arc::new(WorkspaceRegistry::new());
    for root in &args.workspaces {
        let folder = workspaces.add(root.clone());
        info!(name = %folder.name, root = %folder.root.display(), "workspace registered");
    }

    let connections = Arc::new(ConnectionManager::new(
        &config,
        Arc::new(LoopbackResolver),
    ));
    let provider = Arc::new(ServerTaskProvider::new(
        &config,
        Arc::clone(&workspaces),
        telemetry,
    ));

    // Print every resolved connection.
    let _on_connected = connections.on_connected(|info| {
        info!(http = %info.http_uri, ws = %info.ws_uri, workspace = %info.workspace, "connected");
    });

    let _on_open_editor = provider.on_request_open_editor_to_side(|path| {
        info!(path = %path.display(), "open-editor-to-side requested");
    });

    let _on_close = provider.on_request_to_close_server(|ws| {
        info!(workspace = %ws, "server close requested");
    });

    // Toy server manager: on an open request, bind an HTTP and a WS listener
    // on ephemeral loopback ports and report them as connected.
    let open_connections = Arc::clone(&connections);
    let open_workspaces = Arc::clone(&workspaces);
    let open_provider = Arc::clone(&provider);
    let ws_path = config.ws_path.clone();
    let _on_open = provider.on_request_to_open_server(move |key| {
        let connections = Arc::clone(&open_connections);
        let workspaces = Arc::clone(&open_workspaces);
        let provider = Arc::clone(&open_provider);
        let ws_path = ws_path.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let folder = match &key {
                WorkspaceKey::Folder(id) => workspaces.get(id),
                WorkspaceKey::Global => None,
            };
            let connection = connections.get_or_create(folder.as_ref());

            let http = match TcpListener::bind("127.0.0.1:0").await {
                Ok(l) => l,
                Err(e) => {
                    warn!(err = %e, "could not bind http listener");
                    return;
                }
            };
            let ws = match TcpListener::bind("127.0.0.1:0").await {
                Ok(l) => l,
                Err(e) => {
                    warn!(err = %e, "could not bind ws listener");
                    return;
                }
            };
            let http_port = http.local_addr().map(|a| a.port()).unwrap_or_default();
            let ws_port = ws.local_addr().map(|a| a.port()).unwrap_or_default();

            connection.connected(http_port, ws_port, &ws_path).await;
            if let Ok(uri) = connection.resolve_external_http_uri().await {
                provider.server_started(&uri, ServerStartedStatus::JustStarted, &key);
            }

            // Hold the sockets open until shutdown.
            let _keep = (http, ws);
            std::future::pending::<()>().await;
        });
    });

    let host = LocalTaskHost::new(Arc::clone(&provider));
    if args.workspaces.is_empty() {
        provider
            .ext_run_task(args.verbose, &WorkspaceKey::Global, &host)
            .await;
    } else {
        for folder in workspaces.folders() {
            provider
                .ext_run_task(args.verbose, &folder.key(), &host)
                .await;
        }
    }

    info!("running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
