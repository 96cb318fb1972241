use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Loopback default used when no host is configured or the configured host
/// turns out to be unusable for external access.
pub const DEFAULT_HOST: &str = "127.0.0.1";

const DEFAULT_HTTP_PORT: u16 = 3000;
const DEFAULT_WS_PORT: u16 = 3001;
const DEFAULT_WS_PATH: &str = "/ws";
const DEFAULT_TASK_LABEL: &str = "Run Preview Server";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_ws_port() -> u16 {
    DEFAULT_WS_PORT
}

fn default_ws_path() -> String {
    DEFAULT_WS_PATH.to_string()
}

fn default_task_label() -> String {
    DEFAULT_TASK_LABEL.to_string()
}

// ─── TelemetryConfig ─────────────────────────────────────────────────────────

/// Telemetry configuration (`[telemetry]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Master switch. Default: false — telemetry is opt-in.
    pub enabled: bool,
    /// Endpoint the flush task POSTs batches to. None disables flushing even
    /// when `enabled` is set.
    pub endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
        }
    }
}

// ─── BridgeConfig ────────────────────────────────────────────────────────────

/// Top-level configuration for the bridge (config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bind host for new connections. Reset to [`DEFAULT_HOST`] when
    /// externalization shows it cannot be used.
    #[serde(default = "default_host")]
    pub host: String,
    /// Initial HTTP port for new connections (the server manager reports the
    /// actually bound port through `connected`).
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Initial WebSocket port for new connections.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    /// Sub-path appended to the WebSocket URI.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Base label for provided tasks; variant args are appended.
    #[serde(default = "default_task_label")]
    pub task_label: String,
    pub telemetry: TelemetryConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: DEFAULT_HTTP_PORT,
            ws_port: DEFAULT_WS_PORT,
            ws_path: default_ws_path(),
            task_label: default_task_label(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load from a TOML file, falling back to defaults when the file is
    /// missing or malformed. A malformed file is logged, never fatal.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<BridgeConfig>(&raw) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "malformed config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_loopback() {
        let config = BridgeConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.ws_path, "/ws");
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: BridgeConfig = toml::from_str("host = \"0.0.0.0\"").unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.http_port, 3000);
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "host = [not toml").unwrap();
        let config = BridgeConfig::load_or_default(&path);
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn missing_file_falls_back() {
        let config = BridgeConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.http_port, 3000);
    }
}
