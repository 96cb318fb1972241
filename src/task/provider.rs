//! Task lifecycle coordinator for the "run preview server" task type.
//!
//! Implements the pluggable task-provider contract (enumerate, resolve,
//! execute) and owns a workspace-keyed registry of live task terminals. The
//! server manager pushes log lines and start/stop status in through the
//! notification methods; terminal-originated open/close requests flow back
//! out through the coordinator's emitters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::events::{EventEmitter, Subscription};
use crate::telemetry::{TelemetryEvent, TelemetrySender};
use crate::workspace::{WorkspaceKey, WorkspaceRegistry};

use super::definition::{
    ServerMsg, ServerStartedStatus, ServerTask, ServerUri, TaskDefinition, TASK_TYPE, VERBOSE_ARG,
};
use super::host::TaskHost;
use super::terminal::ServerTaskTerminal;

struct TerminalEntry {
    terminal: Arc<ServerTaskTerminal>,
    /// Event wiring into the coordinator emitters; released when the entry
    /// is removed from the registry.
    _subs: Vec<Subscription>,
}

pub struct ServerTaskProvider {
    workspaces: Arc<WorkspaceRegistry>,
    telemetry: TelemetrySender,
    task_label: String,
    /// Memoized `provide_tasks` result; rebuilt after `invalidate_tasks`.
    tasks: Mutex<Option<Vec<ServerTask>>>,
    terminals: Arc<Mutex<HashMap<WorkspaceKey, TerminalEntry>>>,
    open_emitter: EventEmitter<WorkspaceKey>,
    close_emitter: EventEmitter<WorkspaceKey>,
    open_editor_emitter: EventEmitter<PathBuf>,
}

impl ServerTaskProvider {
    pub fn new(
        config: &BridgeConfig,
        workspaces: Arc<WorkspaceRegistry>,
        telemetry: TelemetrySender,
    ) -> Self {
        Self {
            workspaces,
            telemetry,
            task_label: config.task_label.clone(),
            tasks: Mutex::new(None),
            terminals: Arc::new(Mutex::new(HashMap::new())),
            open_emitter: EventEmitter::new(),
            close_emitter: EventEmitter::new(),
            open_editor_emitter: EventEmitter::new(),
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────────

    /// A task terminal asked for the server of the given workspace to start.
    pub fn on_request_to_open_server(
        &self,
        listener: impl Fn(&WorkspaceKey) + Send + Sync + 'static,
    ) -> Subscription {
        self.open_emitter.subscribe(listener)
    }

    /// A task terminal asked for the server of the given workspace to stop.
    pub fn on_request_to_close_server(
        &self,
        listener: impl Fn(&WorkspaceKey) + Send + Sync + 'static,
    ) -> Subscription {
        self.close_emitter.subscribe(listener)
    }

    /// A file link in a terminal should open in an editor to the side.
    pub fn on_request_open_editor_to_side(
        &self,
        listener: impl Fn(&PathBuf) + Send + Sync + 'static,
    ) -> Subscription {
        self.open_editor_emitter.subscribe(listener)
    }

    // ─── Provider contract ───────────────────────────────────────────────────

    /// All task variants this provider offers: a normal and a verbose task
    /// per known workspace, or one global pair when no workspace is open.
    /// Memoized after the first computation.
    pub fn provide_tasks(&self) -> Vec<ServerTask> {
        let mut cache = self.tasks.lock().expect("task cache lock poisoned");
        if let Some(tasks) = cache.as_ref() {
            return tasks.clone();
        }

        let variants: [&[&str]; 2] = [&[VERBOSE_ARG], &[]];
        let mut tasks = Vec::new();
        let folders = self.workspaces.folders();
        if folders.is_empty() {
            for args in variants {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                tasks.push(self.build_task(TaskDefinition::new(args, ""), WorkspaceKey::Global));
            }
        } else {
            for folder in &folders {
                for args in variants {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    tasks.push(self.build_task(
                        TaskDefinition::new(args, folder.root.display().to_string()),
                        folder.key(),
                    ));
                }
            }
        }

        *cache = Some(tasks.clone());
        tasks
    }

    /// Drop the memoized task list, e.g. after workspace folders changed.
    pub fn invalidate_tasks(&self) {
        *self.tasks.lock().expect("task cache lock poisoned") = None;
    }

    /// Rebuild a concrete task from a stored definition, re-deriving the
    /// workspace identity from the path string. An unresolvable path falls
    /// back to the global scope rather than failing.
    pub fn resolve_task(&self, definition: &TaskDefinition) -> ServerTask {
        let scope = self.scope_for(definition);
        self.build_task(definition.clone(), scope)
    }

    /// Execution callback: reuse the running terminal for this workspace if
    /// one exists, otherwise construct one, wire it into the coordinator
    /// emitters, register it, and open it.
    pub fn execute_task(&self, definition: &TaskDefinition) -> Arc<ServerTaskTerminal> {
        let key = self.scope_for(definition);

        {
            let terminals = self.terminals.lock().expect("terminal registry lock poisoned");
            if let Some(entry) = terminals.get(&key) {
                if entry.terminal.running() {
                    debug!(workspace = %key, "reusing running task terminal");
                    return Arc::clone(&entry.terminal);
                }
            }
        }

        let terminal = Arc::new(ServerTaskTerminal::new(definition, key.clone()));

        let open_emitter = self.open_emitter.clone();
        let sub_open = terminal.on_request_to_open_server(move |ws| open_emitter.emit(ws));

        // On close request: forget the terminal first, then forward, so a
        // re-entrant lookup during the close event already sees it gone.
        let close_emitter = self.close_emitter.clone();
        let registry = Arc::clone(&self.terminals);
        let close_key = key.clone();
        let sub_close = terminal.on_request_to_close_server(move |ws| {
            registry
                .lock()
                .expect("terminal registry lock poisoned")
                .remove(&close_key);
            close_emitter.emit(ws);
        });

        let open_editor_emitter = self.open_editor_emitter.clone();
        let sub_editor =
            terminal.on_request_open_editor(move |path| open_editor_emitter.emit(path));

        self.terminals
            .lock()
            .expect("terminal registry lock poisoned")
            .insert(
                key.clone(),
                TerminalEntry {
                    terminal: Arc::clone(&terminal),
                    _subs: vec![sub_open, sub_close, sub_editor],
                },
            );

        info!(workspace = %key, verbose = definition.is_verbose(), "task terminal created");
        terminal.open();
        terminal
    }

    // ─── Notifications from the server manager ──────────────────────────────

    /// `true` when any workspace currently has a running task terminal.
    pub fn is_running(&self) -> bool {
        self.terminals
            .lock()
            .expect("terminal registry lock poisoned")
            .values()
            .any(|entry| entry.terminal.running())
    }

    /// Forward a server log line to the running terminal for `workspace`.
    /// Dropped (not buffered) when none exists.
    pub fn send_server_info_to_terminal(&self, msg: &ServerMsg, workspace: &WorkspaceKey) {
        if let Some(terminal) = self.running_terminal(workspace) {
            terminal.show_server_msg(msg);
        }
    }

    /// Report the outcome of a start request to the running terminal for
    /// `workspace`, if any.
    pub fn server_started(
        &self,
        uri: &ServerUri,
        status: ServerStartedStatus,
        workspace: &WorkspaceKey,
    ) {
        if let Some(terminal) = self.running_terminal(workspace) {
            terminal.server_started(uri, status);
        }
    }

    /// Report the outcome of a stop request. `now` selects between "stopped"
    /// and "will be stopped soon".
    pub fn server_stop(&self, now: bool, workspace: &WorkspaceKey) {
        if let Some(terminal) = self.running_terminal(workspace) {
            if now {
                terminal.server_stopped();
            } else {
                terminal.server_will_be_stopped();
            }
        }
    }

    // ─── Manual-run path ─────────────────────────────────────────────────────

    /// Run the matching task through the host, as triggered from the owning
    /// tool rather than the task UI. Silently a no-op when no task matches.
    pub async fn ext_run_task(
        &self,
        verbose: bool,
        workspace: &WorkspaceKey,
        host: &dyn TaskHost,
    ) {
        self.telemetry
            .send(TelemetryEvent::new("tasks.terminal.startFromExtension"));

        let tasks = host.fetch_tasks(TASK_TYPE).await;
        let matching = tasks.into_iter().find(|task| {
            let variant_matches = if verbose {
                task.definition.is_verbose()
            } else {
                task.definition.args.is_empty()
            };
            variant_matches && self.workspace_path_matches(&task.definition, workspace)
        });

        match matching {
            Some(task) => host.execute(&task).await,
            None => debug!(workspace = %workspace, verbose, "no matching task to run"),
        }
    }

    // ─── Private ─────────────────────────────────────────────────────────────

    fn running_terminal(&self, workspace: &WorkspaceKey) -> Option<Arc<ServerTaskTerminal>> {
        let terminals = self.terminals.lock().expect("terminal registry lock poisoned");
        terminals
            .get(workspace)
            .filter(|entry| entry.terminal.running())
            .map(|entry| Arc::clone(&entry.terminal))
    }

    fn build_task(&self, definition: TaskDefinition, scope: WorkspaceKey) -> ServerTask {
        let label = ServerTask::label_for(&self.task_label, &definition.args);
        ServerTask {
            definition,
            label,
            scope,
        }
    }

    fn scope_for(&self, definition: &TaskDefinition) -> WorkspaceKey {
        if definition.workspace_path.is_empty() {
            return WorkspaceKey::Global;
        }
        self.workspaces
            .folder_for_path(Path::new(&definition.workspace_path))
            .map(|folder| folder.key())
            .unwrap_or(WorkspaceKey::Global)
    }

    fn workspace_path_matches(&self, definition: &TaskDefinition, workspace: &WorkspaceKey) -> bool {
        match workspace {
            WorkspaceKey::Global => definition.workspace_path.is_empty(),
            WorkspaceKey::Folder(id) => match self.workspaces.get(id) {
                Some(folder) => Path::new(&definition.workspace_path) == folder.root,
                None => false,
            },
        }
    }
}
