//! Authoritative local endpoint state for one workspace's preview server
//! pair (HTTP + WebSocket), and its externally reachable URIs.

pub mod manager;

pub use manager::ConnectionManager;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use url::Url;

use crate::events::{EventEmitter, Subscription};
use crate::paths;
use crate::resolver::{ExternalUriResolver, ResolveError};
use crate::workspace::{WorkspaceFolder, WorkspaceKey};

/// Fired to `on_connected` listeners once both URIs of a (re)connect have
/// been resolved. Never carries partial results.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub http_uri: Url,
    pub ws_uri: Url,
    pub workspace: WorkspaceKey,
}

/// Host, ports, and WS sub-path. Kept under one lock so `connected` swaps
/// all of them atomically and readers never observe a torn update.
struct Endpoint {
    host: String,
    http_port: u16,
    ws_port: u16,
    ws_path: String,
}

/// Endpoint state for one workspace-scoped server pair.
///
/// The server manager reports successful binds through [`Connection::connected`];
/// everything else reads. External URIs are resolved on demand through the
/// [`ExternalUriResolver`] and never cached beyond the most recent call.
pub struct Connection {
    workspace: Option<WorkspaceFolder>,
    default_host: String,
    endpoint: Mutex<Endpoint>,
    resolver: Arc<dyn ExternalUriResolver>,
    /// Bumped on every `connected` call; resolutions from an older
    /// generation are dropped instead of emitting stale events.
    generation: AtomicU64,
    connected_emitter: EventEmitter<ConnectionInfo>,
    reset_host_emitter: EventEmitter<String>,
}

impl Connection {
    pub fn new(
        workspace: Option<WorkspaceFolder>,
        http_port: u16,
        ws_port: u16,
        host: impl Into<String>,
        default_host: impl Into<String>,
        resolver: Arc<dyn ExternalUriResolver>,
    ) -> Self {
        Self {
            workspace,
            default_host: default_host.into(),
            endpoint: Mutex::new(Endpoint {
                host: host.into(),
                http_port,
                ws_port,
                ws_path: String::new(),
            }),
            resolver,
            generation: AtomicU64::new(0),
            connected_emitter: EventEmitter::new(),
            reset_host_emitter: EventEmitter::new(),
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────────

    /// Combined external URIs, fired once per completed (re)connect.
    pub fn on_connected(
        &self,
        listener: impl Fn(&ConnectionInfo) + Send + Sync + 'static,
    ) -> Subscription {
        self.connected_emitter.subscribe(listener)
    }

    /// Fired with the new host after [`Connection::reset_host_to_default`]
    /// actually reverted it, so a server restart routine can react.
    pub fn on_should_reset_init_host(
        &self,
        listener: impl Fn(&String) + Send + Sync + 'static,
    ) -> Subscription {
        self.reset_host_emitter.subscribe(listener)
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn workspace(&self) -> Option<&WorkspaceFolder> {
        self.workspace.as_ref()
    }

    pub fn workspace_key(&self) -> WorkspaceKey {
        WorkspaceKey::of(self.workspace.as_ref())
    }

    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace.as_ref().map(|w| w.root.as_path())
    }

    pub fn host(&self) -> String {
        self.endpoint.lock().expect("endpoint lock poisoned").host.clone()
    }

    pub fn http_port(&self) -> u16 {
        self.endpoint.lock().expect("endpoint lock poisoned").http_port
    }

    pub fn ws_port(&self) -> u16 {
        self.endpoint.lock().expect("endpoint lock poisoned").ws_port
    }

    // ─── Connect notification ────────────────────────────────────────────────

    /// Called by the server manager once both servers are bound.
    ///
    /// Records the new endpoint atomically, resolves the HTTP and WS external
    /// URIs concurrently, and emits a single `on_connected` event when both
    /// complete. If `connected` is called again before a previous resolution
    /// finishes, the stale resolution is discarded: only the latest
    /// generation emits. Resolution failure degrades to a logged warning, no
    /// event.
    pub async fn connected(&self, http_port: u16, ws_port: u16, ws_path: &str) {
        let (http_local, ws_local) = {
            let mut endpoint = self.endpoint.lock().expect("endpoint lock poisoned");
            endpoint.http_port = http_port;
            endpoint.ws_port = ws_port;
            endpoint.ws_path = ws_path.to_string();
            (
                local_uri(&endpoint.host, http_port, ""),
                local_uri(&endpoint.host, ws_port, ws_path),
            )
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (http_local, ws_local) = match (http_local, ws_local) {
            (Ok(h), Ok(w)) => (h, w),
            (Err(e), _) | (_, Err(e)) => {
                warn!(err = %e, "cannot build local uri for connection");
                return;
            }
        };

        // Independent resolutions, issued together and joined — a single
        // combined event either way.
        let (http_res, ws_res) = tokio::join!(
            self.resolver.resolve(&http_local),
            self.resolver.resolve(&ws_local),
        );

        let (http_uri, ws_uri) = match (http_res, ws_res) {
            (Ok(h), Ok(w)) => (h, w),
            (Err(e), _) | (_, Err(e)) => {
                warn!(err = %e, "external uri resolution failed");
                return;
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "dropping stale connection resolution");
            return;
        }

        self.connected_emitter.emit(&ConnectionInfo {
            http_uri,
            ws_uri,
            workspace: self.workspace_key(),
        });
    }

    // ─── On-demand resolution ────────────────────────────────────────────────

    /// Resolve the external HTTP URI for the current endpoint. Does not fire
    /// `on_connected`.
    pub async fn resolve_external_http_uri(&self) -> Result<Url, ResolveError> {
        let local = {
            let endpoint = self.endpoint.lock().expect("endpoint lock poisoned");
            local_uri(&endpoint.host, endpoint.http_port, "")?
        };
        self.resolver.resolve(&local).await
    }

    /// Resolve the external WebSocket URI for the current endpoint. Does not
    /// fire `on_connected`.
    pub async fn resolve_external_ws_uri(&self) -> Result<Url, ResolveError> {
        let local = {
            let endpoint = self.endpoint.lock().expect("endpoint lock poisoned");
            local_uri(&endpoint.host, endpoint.ws_port, &endpoint.ws_path)?
        };
        self.resolver.resolve(&local).await
    }

    // ─── Host reset ──────────────────────────────────────────────────────────

    /// Revert an unusable configured host to the default, notifying
    /// `on_should_reset_init_host` listeners. No-op when the host already
    /// equals the default.
    pub fn reset_host_to_default(&self) {
        let reverted = {
            let mut endpoint = self.endpoint.lock().expect("endpoint lock poisoned");
            if endpoint.host == self.default_host {
                false
            } else {
                warn!(
                    host = %endpoint.host,
                    default = %self.default_host,
                    "host cannot be used for the server, reverting to default"
                );
                endpoint.host = self.default_host.clone();
                true
            }
        };
        if reverted {
            self.reset_host_emitter.emit(&self.default_host);
        }
    }

    // ─── Workspace paths ─────────────────────────────────────────────────────

    /// `true` iff a workspace is associated and `<root>/<file>` exists on
    /// disk. Never errors.
    pub fn path_exists_relative_to_workspace(&self, file: &str) -> bool {
        match self.workspace_path() {
            Some(root) => root
                .join(file.trim_start_matches(['/', '\\']))
                .exists(),
            None => false,
        }
    }

    /// Workspace-relative, forward-slash form of `abs_path`, iff it is a
    /// strict path-segment descendant of the workspace root.
    pub fn get_file_relative_to_workspace(&self, abs_path: &Path) -> Option<String> {
        let root = self.workspace_path()?;
        paths::path_relative_to(abs_path, root).map(|rel| paths::to_unix_path(&rel))
    }
}

fn local_uri(host: &str, port: u16, path: &str) -> Result<Url, ResolveError> {
    let path = if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(Url::parse(&format!("http://{host}:{port}{path}"))?)
}
