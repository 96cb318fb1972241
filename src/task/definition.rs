//! Task type, arguments, and wire-level definitions for the
//! "run preview server" task.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::workspace::WorkspaceKey;

/// Task type string this provider registers under with the task host.
pub const TASK_TYPE: &str = "preview-server";

/// Argument selecting the verbose task variant.
pub const VERBOSE_ARG: &str = "--verbose";

/// Whether the task's start request actually started the server, or the
/// server was already running (started earlier by another caller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStartedStatus {
    JustStarted,
    StartedByEmbeddedPrev,
}

/// One server log line pushed into the task terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMsg {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Persistable description of one task variant: `{type, args, workspacePath}`.
/// An empty `workspace_path` denotes the global (no-workspace) context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(rename = "type")]
    pub task_type: String,
    pub args: Vec<String>,
    pub workspace_path: String,
}

impl TaskDefinition {
    pub fn new(args: Vec<String>, workspace_path: impl Into<String>) -> Self {
        Self {
            task_type: TASK_TYPE.to_string(),
            args,
            workspace_path: workspace_path.into(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.args.first().map(String::as_str) == Some(VERBOSE_ARG)
    }
}

/// A concrete, executable task: definition plus display label and resolved
/// scope.
#[derive(Debug, Clone)]
pub struct ServerTask {
    pub definition: TaskDefinition,
    pub label: String,
    pub scope: WorkspaceKey,
}

impl ServerTask {
    /// Display label: base name plus the variant args.
    pub fn label_for(base: &str, args: &[String]) -> String {
        let mut label = base.to_string();
        for arg in args {
            label.push(' ');
            label.push_str(arg);
        }
        label
    }
}

/// External URI the started server is reachable at, as reported back to the
/// terminal.
pub type ServerUri = Url;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_is_first_arg() {
        assert!(TaskDefinition::new(vec![VERBOSE_ARG.to_string()], "").is_verbose());
        assert!(!TaskDefinition::new(vec![], "").is_verbose());
        assert!(!TaskDefinition::new(vec!["--other".to_string()], "").is_verbose());
    }

    #[test]
    fn label_appends_args() {
        assert_eq!(
            ServerTask::label_for("Run Preview Server", &["--verbose".to_string()]),
            "Run Preview Server --verbose"
        );
        assert_eq!(ServerTask::label_for("Run Preview Server", &[]), "Run Preview Server");
    }
}
