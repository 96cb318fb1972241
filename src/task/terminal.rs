//! Pseudo-terminal for one running server-launch task.
//!
//! The terminal is the task's live status surface: it receives log and
//! lifecycle notifications from the coordinator and emits its own open/close
//! server requests, which the coordinator relays to the server manager. The
//! output stream stands in for the host terminal's write channel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use tracing::debug;

use crate::events::{EventEmitter, Subscription};
use crate::workspace::WorkspaceKey;

use super::definition::{ServerMsg, ServerStartedStatus, ServerUri, TaskDefinition};

pub struct ServerTaskTerminal {
    workspace: WorkspaceKey,
    verbose: bool,
    running: AtomicBool,
    output_emitter: EventEmitter<String>,
    open_emitter: EventEmitter<WorkspaceKey>,
    close_emitter: EventEmitter<WorkspaceKey>,
    open_editor_emitter: EventEmitter<PathBuf>,
}

impl ServerTaskTerminal {
    pub fn new(definition: &TaskDefinition, workspace: WorkspaceKey) -> Self {
        Self {
            workspace,
            verbose: definition.is_verbose(),
            running: AtomicBool::new(false),
            output_emitter: EventEmitter::new(),
            open_emitter: EventEmitter::new(),
            close_emitter: EventEmitter::new(),
            open_editor_emitter: EventEmitter::new(),
        }
    }

    pub fn workspace(&self) -> &WorkspaceKey {
        &self.workspace
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ─── Events ──────────────────────────────────────────────────────────────

    /// Lines the terminal writes to its output surface.
    pub fn on_output(&self, listener: impl Fn(&String) + Send + Sync + 'static) -> Subscription {
        self.output_emitter.subscribe(listener)
    }

    /// The terminal wants the server for its workspace started.
    pub fn on_request_to_open_server(
        &self,
        listener: impl Fn(&WorkspaceKey) + Send + Sync + 'static,
    ) -> Subscription {
        self.open_emitter.subscribe(listener)
    }

    /// The terminal wants the server for its workspace stopped and itself
    /// closed.
    pub fn on_request_to_close_server(
        &self,
        listener: impl Fn(&WorkspaceKey) + Send + Sync + 'static,
    ) -> Subscription {
        self.close_emitter.subscribe(listener)
    }

    /// A file path in the output was activated and should open in an editor
    /// to the side.
    pub fn on_request_open_editor(
        &self,
        listener: impl Fn(&PathBuf) + Send + Sync + 'static,
    ) -> Subscription {
        self.open_editor_emitter.subscribe(listener)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Called when the host actually runs the task. Marks the terminal
    /// running and requests a server start.
    pub fn open(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!(workspace = %self.workspace, "terminal already open");
            return;
        }
        self.write_line("Starting the preview server...");
        self.open_emitter.emit(&self.workspace);
    }

    /// User-initiated close (e.g. Ctrl+C in the terminal). Stops accepting
    /// notifications and asks the coordinator to close the server.
    pub fn request_close(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.write_line("Closing the server...");
        self.close_emitter.emit(&self.workspace);
    }

    // ─── Notifications from the coordinator ──────────────────────────────────

    /// Server log line. Only the verbose variant prints request traffic.
    pub fn show_server_msg(&self, msg: &ServerMsg) {
        if !self.verbose {
            return;
        }
        let status = msg
            .status
            .map(|s| format!(" | {s}"))
            .unwrap_or_default();
        let ts = Local::now().format("%H:%M:%S");
        self.write_line(&format!("[{ts}] {} {}{status}", msg.method, msg.url));
    }

    pub fn server_started(&self, uri: &ServerUri, status: ServerStartedStatus) {
        match status {
            ServerStartedStatus::JustStarted => {
                self.write_line(&format!("Served at {uri}"));
            }
            ServerStartedStatus::StartedByEmbeddedPrev => {
                self.write_line(&format!("Server already running at {uri}"));
            }
        }
    }

    /// The server is gone; the terminal's work is done.
    pub fn server_stopped(&self) {
        self.write_line("Server stopped.");
        self.running.store(false, Ordering::SeqCst);
    }

    /// The server keeps running for other consumers; this task will finish
    /// once the last one disconnects.
    pub fn server_will_be_stopped(&self) {
        self.write_line("The server will stop once all embedded previews close.");
    }

    /// Surface a clicked file path as an open-editor-to-side request.
    pub fn request_open_editor(&self, path: PathBuf) {
        self.open_editor_emitter.emit(&path);
    }

    fn write_line(&self, line: &str) {
        self.output_emitter.emit(&line.to_string());
    }
}
