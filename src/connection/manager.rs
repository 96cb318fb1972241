//! Workspace-keyed registry of [`Connection`]s.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config::BridgeConfig;
use crate::events::{EventEmitter, Subscription};
use crate::resolver::ExternalUriResolver;
use crate::workspace::{WorkspaceFolder, WorkspaceKey};

use super::{Connection, ConnectionInfo};

struct Entry {
    connection: Arc<Connection>,
    /// Forwards the connection's `on_connected` into the aggregate emitter;
    /// dropped (and thereby unsubscribed) together with the entry.
    _forward: Subscription,
}

/// Creates connections on demand, one per workspace key, and aggregates
/// their `on_connected` events into a single stream.
pub struct ConnectionManager {
    host: String,
    default_host: String,
    http_port: u16,
    ws_port: u16,
    resolver: Arc<dyn ExternalUriResolver>,
    connections: Mutex<HashMap<WorkspaceKey, Entry>>,
    connected_emitter: EventEmitter<ConnectionInfo>,
}

impl ConnectionManager {
    pub fn new(config: &BridgeConfig, resolver: Arc<dyn ExternalUriResolver>) -> Self {
        Self {
            host: config.host.clone(),
            default_host: crate::config::DEFAULT_HOST.to_string(),
            http_port: config.http_port,
            ws_port: config.ws_port,
            resolver,
            connections: Mutex::new(HashMap::new()),
            connected_emitter: EventEmitter::new(),
        }
    }

    /// Any connection's resolved URIs, across all workspaces.
    pub fn on_connected(
        &self,
        listener: impl Fn(&ConnectionInfo) + Send + Sync + 'static,
    ) -> Subscription {
        self.connected_emitter.subscribe(listener)
    }

    /// The connection for `folder` (or the global connection), creating it
    /// on first use.
    pub fn get_or_create(&self, folder: Option<&WorkspaceFolder>) -> Arc<Connection> {
        let key = WorkspaceKey::of(folder);
        let mut connections = self.connections.lock().expect("connection lock poisoned");
        if let Some(entry) = connections.get(&key) {
            return Arc::clone(&entry.connection);
        }

        let connection = Arc::new(Connection::new(
            folder.cloned(),
            self.http_port,
            self.ws_port,
            self.host.clone(),
            self.default_host.clone(),
            Arc::clone(&self.resolver),
        ));
        let aggregate = self.connected_emitter.clone();
        let forward = connection.on_connected(move |info| aggregate.emit(info));
        info!(workspace = %key, "created connection");

        connections.insert(
            key,
            Entry {
                connection: Arc::clone(&connection),
                _forward: forward,
            },
        );
        connection
    }

    pub fn get(&self, key: &WorkspaceKey) -> Option<Arc<Connection>> {
        self.connections
            .lock()
            .expect("connection lock poisoned")
            .get(key)
            .map(|entry| Arc::clone(&entry.connection))
    }

    /// Drop the connection for `key`. Its event wiring is released with it.
    pub fn remove(&self, key: &WorkspaceKey) -> Option<Arc<Connection>> {
        self.connections
            .lock()
            .expect("connection lock poisoned")
            .remove(key)
            .map(|entry| entry.connection)
    }
}
